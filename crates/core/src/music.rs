use serde::{Deserialize, Serialize};

/// 背景音乐曲目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicTrack {
    pub id: String,
    pub name: String,
    pub url: String,
    pub tag: String,
}

impl MusicTrack {
    fn new(id: &str, name: &str, file: &str, tag: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            url: format!("{INCOMPETECH_BASE_URL}/{file}"),
            tag: tag.to_string(),
        }
    }
}

const INCOMPETECH_BASE_URL: &str = "https://incompetech.com/music/royalty-free/mp3-royaltyfree";

/// 曲库：把请求中的曲目ID解析成可下载的URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicCatalog {
    pub tracks: Vec<MusicTrack>,
}

impl MusicCatalog {
    pub fn new(tracks: Vec<MusicTrack>) -> Self {
        Self { tracks }
    }

    pub fn find(&self, id: &str) -> Option<&MusicTrack> {
        self.tracks.iter().find(|t| t.id == id)
    }

    /// 解析音乐引用
    ///
    /// 以`http`开头的值视为直接URL原样返回；否则按曲目ID查找，
    /// 找不到时也原样返回，由Worker自行处理。
    pub fn resolve(&self, music_ref: Option<String>) -> Option<String> {
        let music_ref = music_ref?;
        if music_ref.starts_with("http") {
            return Some(music_ref);
        }
        match self.find(&music_ref) {
            Some(track) => Some(track.url.clone()),
            None => Some(music_ref),
        }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

impl Default for MusicCatalog {
    fn default() -> Self {
        Self::new(vec![
            MusicTrack::new("epic_battle", "1. Shonen Battle (Epic Rock)", "Volatile%20Reaction.mp3", "Action"),
            MusicTrack::new("sad_emotional", "2. Sad Backstory (Piano/Violin)", "Sad%20Trio.mp3", "Sad"),
            MusicTrack::new("tension_suspense", "3. Plot Twist (Suspense)", "Oppressive%20Gloom.mp3", "Mystery"),
            MusicTrack::new("heroic_victory", "4. Hero Arrives (Orchestral)", "Heroic%20Age.mp3", "Epic"),
            MusicTrack::new("comedy_funny", "5. Funny Moments (Slice of Life)", "Monkeys%20Spinning%20Monkeys.mp3", "Fun"),
            MusicTrack::new("dark_villain", "6. Villain Theme (Dark/Creepy)", "Impact%20Moderato.mp3", "Dark"),
            MusicTrack::new("training_montage", "7. Training Arc (Upbeat)", "Take%20a%20Chance.mp3", "Motivational"),
            MusicTrack::new("japan_traditional", "8. Ancient Era (Shamisen/Koto)", "Ishikari%20Lore.mp3", "Traditional"),
            MusicTrack::new("lofi_chill", "9. Reading Mode (Lofi Hip Hop)", "Dream%20Culture.mp3", "Chill"),
            MusicTrack::new("horror_seinen", "10. Horror/Gore (Ambient)", "Giant%20Wyrm.mp3", "Horror"),
            MusicTrack::new("fast_paced", "11. Speed Lines (Fast Drum&Bass)", "Movement%20Proposition.mp3", "Fast"),
            MusicTrack::new("mystery_detective", "12. Investigation (Detective)", "I%20Knew%20a%20Guy.mp3", "Jazz"),
            MusicTrack::new("fantasy_adventure", "13. New World (Fantasy)", "Celtic%20Impulse.mp3", "Adventure"),
            MusicTrack::new("romance_cute", "14. Romance (Cute/Piano)", "Touching%20Moments%20Two.mp3", "Romance"),
            MusicTrack::new("ending_credits", "15. Emotional Ending (Finale)", "Sovereign.mp3", "Ending"),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog() {
        let catalog = MusicCatalog::default();
        assert_eq!(catalog.len(), 15);
        let track = catalog.find("lofi_chill").unwrap();
        assert_eq!(
            track.url,
            "https://incompetech.com/music/royalty-free/mp3-royaltyfree/Dream%20Culture.mp3"
        );
    }

    #[test]
    fn test_resolve() {
        let catalog = MusicCatalog::default();

        assert_eq!(catalog.resolve(None), None);
        assert_eq!(
            catalog.resolve(Some("https://example.com/own.mp3".to_string())),
            Some("https://example.com/own.mp3".to_string())
        );
        assert_eq!(
            catalog.resolve(Some("ending_credits".to_string())),
            Some("https://incompetech.com/music/royalty-free/mp3-royaltyfree/Sovereign.mp3".to_string())
        );
        // 未知ID原样透传
        assert_eq!(
            catalog.resolve(Some("unknown_track".to_string())),
            Some("unknown_track".to_string())
        );
    }
}
