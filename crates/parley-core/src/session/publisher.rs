//! Progressive publishing of a streaming reply.
//!
//! A placeholder is sent up front and revised as the reply grows, at most
//! once per revision interval. Live revisions show only the trailing window
//! that fits in one message; the full text is restored on delivery, split
//! into as many messages as needed.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::channel::chunk::{delivery_segments, live_window};
use crate::channel::{MessageHandle, ReplySurface};
use crate::error::TransportError;

/// Revises a placeholder while a reply streams in.
pub struct ProgressPublisher<'a> {
    surface: &'a dyn ReplySurface,
    handle: MessageHandle,
    limit: usize,
    interval: Duration,
    last_revision: Instant,
}

impl<'a> ProgressPublisher<'a> {
    /// Send the placeholder and start the revision clock.
    pub async fn start(
        surface: &'a dyn ReplySurface,
        placeholder: &str,
        limit: usize,
        interval: Duration,
    ) -> Result<Self, TransportError> {
        let handle = surface.send(placeholder).await?;
        Ok(Self {
            surface,
            handle,
            limit,
            interval,
            last_revision: Instant::now(),
        })
    }

    pub fn handle(&self) -> &MessageHandle {
        &self.handle
    }

    /// Offer the accumulated reply. Returns whether a revision was sent.
    pub async fn on_update(&mut self, accumulated: &str) -> Result<bool, TransportError> {
        self.on_update_at(accumulated, Instant::now()).await
    }

    pub async fn on_update_at(
        &mut self,
        accumulated: &str,
        now: Instant,
    ) -> Result<bool, TransportError> {
        if now.saturating_duration_since(self.last_revision) < self.interval {
            return Ok(false);
        }
        // Discord rejects blank content.
        if accumulated.trim().is_empty() {
            return Ok(false);
        }

        self.surface
            .revise(&self.handle, live_window(accumulated, self.limit))
            .await?;
        self.last_revision = now;
        Ok(true)
    }

    /// Overwrite the placeholder with a notice.
    pub async fn replace(&self, notice: &str) -> Result<(), TransportError> {
        self.surface.revise(&self.handle, notice).await
    }

    /// Deliver the full reply: the first segment revises the placeholder,
    /// the rest follow as new messages in order. Returns the segment count.
    pub async fn deliver(self, reply: &str) -> Result<usize, TransportError> {
        let segments = delivery_segments(reply, self.limit);
        let mut parts = segments.iter();

        let Some(first) = parts.next() else {
            return Ok(0);
        };
        self.surface.revise(&self.handle, first).await?;
        for part in parts {
            self.surface.send(part).await?;
        }

        debug!("Delivered reply in {} segment(s)", segments.len());
        Ok(segments.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::mock::{MockSurface, SurfaceEvent};

    const INTERVAL: Duration = Duration::from_millis(600);

    #[tokio::test]
    async fn test_start_sends_placeholder() {
        let surface = MockSurface::new();
        let publisher = ProgressPublisher::start(&surface, "thinking", 2000, INTERVAL)
            .await
            .unwrap();
        assert_eq!(surface.sent(), vec!["thinking"]);
        assert_eq!(publisher.handle().message_id, "msg-0");
    }

    #[tokio::test]
    async fn test_revisions_are_rate_limited() {
        let surface = MockSurface::new();
        let mut publisher = ProgressPublisher::start(&surface, "thinking", 2000, INTERVAL)
            .await
            .unwrap();
        let t0 = publisher.last_revision;

        // A burst of increments inside one interval revises nothing.
        assert!(!publisher.on_update_at("a", t0 + Duration::from_millis(10)).await.unwrap());
        assert!(!publisher.on_update_at("ab", t0 + Duration::from_millis(300)).await.unwrap());
        assert!(publisher.on_update_at("abc", t0 + INTERVAL).await.unwrap());
        assert!(!publisher.on_update_at("abcd", t0 + Duration::from_millis(900)).await.unwrap());
        assert!(publisher.on_update_at("abcde", t0 + Duration::from_millis(1300)).await.unwrap());

        assert_eq!(surface.revisions(), vec!["abc", "abcde"]);
    }

    #[tokio::test]
    async fn test_blank_progress_is_not_published() {
        let surface = MockSurface::new();
        let mut publisher = ProgressPublisher::start(&surface, "thinking", 2000, INTERVAL)
            .await
            .unwrap();
        let later = publisher.last_revision + Duration::from_secs(5);
        assert!(!publisher.on_update_at("  \n", later).await.unwrap());
        assert!(surface.revisions().is_empty());
    }

    #[tokio::test]
    async fn test_live_revision_shows_trailing_window() {
        let surface = MockSurface::new();
        let mut publisher = ProgressPublisher::start(&surface, "thinking", 5, INTERVAL)
            .await
            .unwrap();
        let later = publisher.last_revision + Duration::from_secs(1);
        publisher.on_update_at("0123456789", later).await.unwrap();
        assert_eq!(surface.revisions(), vec!["56789"]);
    }

    #[tokio::test]
    async fn test_deliver_single_segment_revises_placeholder() {
        let surface = MockSurface::new();
        let publisher = ProgressPublisher::start(&surface, "thinking", 2000, INTERVAL)
            .await
            .unwrap();
        let count = publisher.deliver("Hi there").await.unwrap();

        assert_eq!(count, 1);
        assert_eq!(surface.sent(), vec!["thinking"]);
        assert_eq!(surface.current_content("msg-0").as_deref(), Some("Hi there"));
    }

    #[tokio::test]
    async fn test_deliver_multiple_segments_in_order() {
        let surface = MockSurface::new();
        let publisher = ProgressPublisher::start(&surface, "thinking", 10, INTERVAL)
            .await
            .unwrap();
        let count = publisher
            .deliver("first part\nsecond bit\nthird")
            .await
            .unwrap();

        assert_eq!(count, 3);
        assert_eq!(
            surface.events(),
            vec![
                SurfaceEvent::Sent {
                    message_id: "msg-0".to_string(),
                    content: "thinking".to_string()
                },
                SurfaceEvent::Revised {
                    message_id: "msg-0".to_string(),
                    content: "first part".to_string()
                },
                SurfaceEvent::Sent {
                    message_id: "msg-1".to_string(),
                    content: "second bit".to_string()
                },
                SurfaceEvent::Sent {
                    message_id: "msg-2".to_string(),
                    content: "third".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_replace_overwrites_placeholder() {
        let surface = MockSurface::new();
        let publisher = ProgressPublisher::start(&surface, "thinking", 2000, INTERVAL)
            .await
            .unwrap();
        publisher.replace("The model returned no output.").await.unwrap();
        assert_eq!(
            surface.current_content("msg-0").as_deref(),
            Some("The model returned no output.")
        );
    }
}
