use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 任务标识符
///
/// 在任务的整个生命周期内唯一，同时作为队列、绑定表和待响应表的键。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// 生成新的任务ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for JobId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

/// 源图片引用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

/// 调用方提交的视频渲染请求
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRequest {
    pub images: Vec<ImageRef>,
    /// 渲染配置，对分发器不透明，原样交给Worker
    #[serde(default)]
    pub config: serde_json::Value,
    #[serde(default)]
    pub music_url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// 下发给Worker的任务载荷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPayload {
    pub job_id: JobId,
    pub images: Vec<ImageRef>,
    #[serde(default)]
    pub config: serde_json::Value,
    #[serde(default)]
    pub music_url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// 队列中的任务
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub payload: TaskPayload,
    pub enqueued_at: DateTime<Utc>,
    /// 已被下发给Worker的次数
    pub attempts: u32,
}

impl Job {
    /// 根据请求创建新任务
    pub fn new(request: VideoRequest, now: DateTime<Utc>) -> Self {
        let id = JobId::new();
        Self {
            id,
            payload: TaskPayload {
                job_id: id,
                images: request.images,
                config: request.config,
                music_url: request.music_url,
                title: request.title,
            },
            enqueued_at: now,
            attempts: 0,
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.payload.title.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_job_id_roundtrip_through_string() {
        let id = JobId::new();
        let parsed: JobId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-job".parse::<JobId>().is_err());
    }

    #[test]
    fn test_task_payload_wire_shape() {
        let request = VideoRequest {
            images: vec![ImageRef {
                url: "https://cdn.example.com/p1.jpg".to_string(),
                alt: Some("Page 1".to_string()),
            }],
            config: json!({ "ratio": "9:16", "durationPerImg": 3 }),
            music_url: Some("https://music.example.com/a.mp3".to_string()),
            title: Some("Chapter 1".to_string()),
        };
        let job = Job::new(request, Utc::now());
        let value = serde_json::to_value(&job.payload).unwrap();

        assert_eq!(value["jobId"], json!(job.id.to_string()));
        assert_eq!(value["images"][0]["url"], "https://cdn.example.com/p1.jpg");
        assert_eq!(value["config"]["ratio"], "9:16");
        assert_eq!(value["musicUrl"], "https://music.example.com/a.mp3");
        assert_eq!(value["title"], "Chapter 1");
        assert_eq!(job.attempts, 0);
    }

    #[test]
    fn test_video_request_defaults() {
        let request: VideoRequest =
            serde_json::from_value(json!({ "images": [{ "url": "a.jpg" }] })).unwrap();
        assert_eq!(request.images.len(), 1);
        assert!(request.config.is_null());
        assert!(request.music_url.is_none());
        assert!(request.title.is_none());
    }
}
