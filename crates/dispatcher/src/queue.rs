use std::collections::VecDeque;

use vidqueue_core::models::{Job, JobId};

/// 先进先出的待分发任务队列
///
/// 任务一旦出队即不在队列中，重新入队的任务排在队尾。
#[derive(Debug, Default)]
pub struct JobQueue {
    jobs: VecDeque<Job>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, job: Job) {
        self.jobs.push_back(job);
    }

    pub fn dequeue(&mut self) -> Option<Job> {
        self.jobs.pop_front()
    }

    /// 从队列中间移除指定任务（调用方已断开或结果已提前到达）
    pub fn remove(&mut self, job_id: &JobId) -> Option<Job> {
        let index = self.jobs.iter().position(|job| &job.id == job_id)?;
        self.jobs.remove(index)
    }

    pub fn contains(&self, job_id: &JobId) -> bool {
        self.jobs.iter().any(|job| &job.id == job_id)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use vidqueue_core::models::{ImageRef, VideoRequest};

    fn job(title: &str) -> Job {
        Job::new(
            VideoRequest {
                images: vec![ImageRef {
                    url: format!("https://cdn.example.com/{title}.jpg"),
                    alt: None,
                }],
                title: Some(title.to_string()),
                ..Default::default()
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = JobQueue::new();
        let (a, b, c) = (job("a"), job("b"), job("c"));
        let ids = [a.id, b.id, c.id];
        queue.enqueue(a);
        queue.enqueue(b);
        queue.enqueue(c);

        assert_eq!(queue.len(), 3);
        for id in ids {
            assert_eq!(queue.dequeue().map(|j| j.id), Some(id));
        }
        assert!(queue.dequeue().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_remove_keeps_order_of_others() {
        let mut queue = JobQueue::new();
        let (a, b, c) = (job("a"), job("b"), job("c"));
        let (a_id, b_id, c_id) = (a.id, b.id, c.id);
        queue.enqueue(a);
        queue.enqueue(b);
        queue.enqueue(c);

        assert_eq!(queue.remove(&b_id).map(|j| j.id), Some(b_id));
        assert!(queue.remove(&b_id).is_none());
        assert!(!queue.contains(&b_id));

        let remaining: Vec<_> = queue.iter().map(|j| j.id).collect();
        assert_eq!(remaining, vec![a_id, c_id]);
    }
}
