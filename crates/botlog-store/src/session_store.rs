//! Session persistence with progressive quota degradation.
//!
//! Auto-save is fire-and-forget: the caller's in-memory state is never
//! touched, and an over-budget snapshot sheds its heaviest data first —
//! embedded payloads, then all images, then the older half of the
//! transcript — rather than failing the save.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use botlog_canvas::{Canvas, Session};
use botlog_core::{BotlogConfig, BotlogResult};

/// One row in the session history panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub title: String,
    pub updated_at: DateTime<Utc>,
    pub messages: usize,
    pub cards: usize,
}

pub struct SessionStore {
    dir: PathBuf,
    max_sessions: usize,
    budget_bytes: u64,
}

impl SessionStore {
    pub fn open(config: &BotlogConfig) -> BotlogResult<Self> {
        let dir = expand_tilde(&config.storage.session_dir);
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            max_sessions: config.storage.max_sessions,
            budget_bytes: config.storage.session_budget_bytes,
        })
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    /// Persist a snapshot of the session. The in-memory session is cloned
    /// and degraded as needed; the original is never modified.
    pub fn save(&self, session: &Session) -> BotlogResult<()> {
        let mut snapshot = session.clone();
        if snapshot.title.is_empty() {
            snapshot.title = snapshot.derive_title();
        }

        // Bounded storage never holds raw payloads, only durable URLs.
        strip_embedded_payloads(&mut snapshot.canvas);
        let mut raw = serde_json::to_vec(&snapshot)?;

        if raw.len() as u64 > self.budget_bytes {
            warn!(
                session = %snapshot.id,
                "session snapshot over budget ({} bytes), stripping images",
                raw.len()
            );
            strip_all_images(&mut snapshot.canvas);
            raw = serde_json::to_vec(&snapshot)?;
        }

        if raw.len() as u64 > self.budget_bytes {
            warn!(
                session = %snapshot.id,
                "session snapshot still over budget, trimming older history"
            );
            let keep = snapshot.messages.len() / 2;
            let drop = snapshot.messages.len() - keep;
            snapshot.messages.drain(..drop);
            raw = serde_json::to_vec(&snapshot)?;
        }

        let path = self.path_for(&snapshot.id);
        let tmp = path.with_extension("tmp");
        let write = std::fs::write(&tmp, &raw).and_then(|_| std::fs::rename(&tmp, &path));
        if let Err(err) = write {
            // Last-resort recovery: make room and retry once.
            warn!("session write failed ({}), pruning oldest sessions", err);
            self.prune(self.max_sessions / 2)?;
            std::fs::write(&tmp, &raw)?;
            std::fs::rename(&tmp, &path)?;
        }

        self.prune(self.max_sessions)?;
        Ok(())
    }

    pub fn load(&self, id: &str) -> BotlogResult<Option<Session>> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    /// All sessions, newest first.
    pub fn list(&self) -> BotlogResult<Vec<SessionSummary>> {
        let mut summaries = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let raw = match std::fs::read_to_string(&path) {
                Ok(raw) => raw,
                Err(err) => {
                    warn!("skipping unreadable session {}: {}", path.display(), err);
                    continue;
                }
            };
            match serde_json::from_str::<Session>(&raw) {
                Ok(session) => summaries.push(SessionSummary {
                    id: session.id,
                    title: session.title,
                    updated_at: session.updated_at,
                    messages: session.messages.len(),
                    cards: session.canvas.len(),
                }),
                Err(err) => {
                    warn!("skipping corrupt session {}: {}", path.display(), err);
                }
            }
        }
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    pub fn delete(&self, id: &str) -> BotlogResult<bool> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(path)?;
        Ok(true)
    }

    /// Remove every stored session.
    pub fn clear(&self) -> BotlogResult<()> {
        for summary in self.list()? {
            self.delete(&summary.id)?;
        }
        Ok(())
    }

    /// Keep the `keep` newest sessions, deleting the rest.
    fn prune(&self, keep: usize) -> BotlogResult<()> {
        let summaries = self.list()?;
        for summary in summaries.iter().skip(keep) {
            warn!(session = %summary.id, "pruning session past the cap");
            self.delete(&summary.id)?;
        }
        Ok(())
    }
}

/// Drop embedded payloads, keeping durable URLs only.
fn strip_embedded_payloads(canvas: &mut Canvas) {
    for card in canvas.cards_mut() {
        card.images.retain(|a| !a.is_embedded());
        if card
            .image
            .as_deref()
            .map(|u| u.starts_with("data:"))
            .unwrap_or(false)
        {
            card.image = card.images.first().map(|a| a.url.clone());
            card.image_prompt = card.images.first().map(|a| a.prompt.clone());
        }
        if card
            .reference_image
            .as_deref()
            .map(|u| u.starts_with("data:"))
            .unwrap_or(false)
        {
            card.reference_image = None;
        }
        if let Some(analysis) = card.analysis.as_mut() {
            for scene in &mut analysis.scenes {
                if scene
                    .generated_image
                    .as_deref()
                    .map(|u| u.starts_with("data:"))
                    .unwrap_or(false)
                {
                    scene.generated_image = None;
                }
                scene.reference_image = None;
            }
            if let Some(cover) = analysis.cover.as_mut() {
                if cover
                    .generated_image
                    .as_deref()
                    .map(|u| u.starts_with("data:"))
                    .unwrap_or(false)
                {
                    cover.generated_image = None;
                }
                cover.reference_image = None;
            }
        }
    }
}

/// Heaviest-first shedding: drop every image and cached analysis.
fn strip_all_images(canvas: &mut Canvas) {
    for card in canvas.cards_mut() {
        card.images.clear();
        card.image = None;
        card.image_prompt = None;
        card.analysis = None;
        card.reference_image = None;
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            if path == "~" {
                return home;
            }
            return home.join(path.trim_start_matches("~/"));
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use botlog_canvas::{ImageAttachment, Role};

    fn store_at(label: &str, budget: u64, max_sessions: usize) -> (SessionStore, PathBuf) {
        let root = std::env::temp_dir().join(format!("botlog_sessions_{}_{}", label, std::process::id()));
        let _ = std::fs::remove_dir_all(&root);
        let mut config = BotlogConfig::default();
        config.storage.session_dir = root.to_string_lossy().into_owned();
        config.storage.session_budget_bytes = budget;
        config.storage.max_sessions = max_sessions;
        (SessionStore::open(&config).unwrap(), root)
    }

    fn session_with_images() -> Session {
        let mut session = Session::new();
        session.push_message(Role::User, "write about cabins");
        let id = session.canvas.insert(None, "A cabin in the woods");
        let card = session.canvas.get_mut(&id).unwrap();
        card.push_image(ImageAttachment::new("https://example.com/a.png", "durable"));
        card.push_image(ImageAttachment::new(
            "data:image/png;base64,AAAA",
            "embedded",
        ));
        session
    }

    #[test]
    fn test_roundtrip_keeps_durable_urls_only() {
        let (store, root) = store_at("roundtrip", 4 * 1024 * 1024, 20);
        let session = session_with_images();
        store.save(&session).unwrap();

        let loaded = store.load(&session.id).unwrap().unwrap();
        let card = &loaded.canvas.cards()[0];
        assert_eq!(card.images.len(), 1);
        assert_eq!(card.images[0].url, "https://example.com/a.png");
        // The caller's session is untouched.
        assert_eq!(session.canvas.cards()[0].images.len(), 2);
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_over_budget_snapshot_sheds_images() {
        let (store, root) = store_at("budget", 1500, 20);
        let mut session = session_with_images();
        // A durable attachment heavy enough to blow the budget on its own.
        let id = session.canvas.cards()[0].id.clone();
        session
            .canvas
            .get_mut(&id)
            .unwrap()
            .push_image(ImageAttachment::new(
                "https://example.com/b.png",
                "p".repeat(2000),
            ));
        store.save(&session).unwrap();

        let loaded = store.load(&session.id).unwrap().unwrap();
        assert!(loaded.canvas.cards()[0].images.is_empty());
        assert!(loaded.canvas.cards()[0].image.is_none());
        // The transcript survives the image-shedding step.
        assert_eq!(loaded.messages.len(), 1);
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_deep_over_budget_trims_history() {
        let (store, root) = store_at("trim", 600, 20);
        let mut session = Session::new();
        for i in 0..20 {
            session.push_message(Role::User, format!("message number {}", i));
        }
        store.save(&session).unwrap();

        let loaded = store.load(&session.id).unwrap().unwrap();
        assert!(loaded.messages.len() < 20);
        // Trimming drops the oldest half; the newest message survives.
        assert_eq!(
            loaded.messages.last().map(|m| m.content.as_str()),
            Some("message number 19")
        );
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_session_cap_drops_oldest() {
        let (store, root) = store_at("cap", 4 * 1024 * 1024, 2);
        let mut ids = Vec::new();
        for i in 0..3 {
            let mut session = Session::new();
            session.push_message(Role::User, format!("session {}", i));
            // Distinct updated_at ordering.
            std::thread::sleep(std::time::Duration::from_millis(5));
            store.save(&session).unwrap();
            ids.push(session.id);
        }
        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|s| s.id != ids[0]));
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_delete_and_clear() {
        let (store, root) = store_at("delete", 4 * 1024 * 1024, 20);
        let session = Session::new();
        store.save(&session).unwrap();
        assert!(store.delete(&session.id).unwrap());
        assert!(!store.delete(&session.id).unwrap());

        store.save(&Session::new()).unwrap();
        store.clear().unwrap();
        assert!(store.list().unwrap().is_empty());
        let _ = std::fs::remove_dir_all(&root);
    }
}
