// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Galatea-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Galatea and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Per-project broadcast groups with best-effort, at-most-once delivery.
//!
//! Every local mutation publishes the full snapshot to the other members of
//! the project's group; receivers apply it wholesale. There is no
//! acknowledgement and no replay — a member with a full mailbox simply loses
//! the frame and catches up from the persisted document on its next open.
//! The hub is a seam: a version-stamped replication strategy could replace
//! it without touching the mutation API.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use smallvec::SmallVec;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::model::{CanvasState, ClientId, ProjectId};

/// Frames a slow member can queue before publishes to it are dropped.
pub const SUBSCRIPTION_BUFFER: usize = 32;

/// A full-snapshot frame delivered to the other members of a group.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasFrame {
    pub project_id: ProjectId,
    pub state: CanvasState,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublishOutcome {
    pub delivered: usize,
    pub dropped: usize,
}

#[derive(Debug, Default)]
struct HubInner {
    groups: Mutex<BTreeMap<ProjectId, BTreeMap<ClientId, mpsc::Sender<CanvasFrame>>>>,
}

impl HubInner {
    fn leave(
        &self,
        project_id: &ProjectId,
        client_id: &ClientId,
        sender: &mpsc::Sender<CanvasFrame>,
    ) {
        let mut groups = self.groups.lock().expect("broadcast hub lock poisoned");
        if let Some(group) = groups.get_mut(project_id) {
            let is_current = group
                .get(client_id)
                .is_some_and(|current| current.same_channel(sender));
            if is_current {
                group.remove(client_id);
            }
            if group.is_empty() {
                groups.remove(project_id);
            }
        }
    }
}

/// Cheap-to-clone handle; clones share the same membership table.
#[derive(Debug, Clone, Default)]
pub struct BroadcastHub {
    inner: Arc<HubInner>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Joins the group for a project. A second join by the same client
    /// replaces the first membership; the stale subscription stops receiving
    /// but its drop cannot evict the new one.
    pub fn join(&self, client_id: ClientId, project_id: ProjectId) -> Subscription {
        let (sender, receiver) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let mut groups = self
            .inner
            .groups
            .lock()
            .expect("broadcast hub lock poisoned");
        groups
            .entry(project_id.clone())
            .or_default()
            .insert(client_id.clone(), sender.clone());
        drop(groups);

        Subscription {
            hub: self.inner.clone(),
            client_id,
            project_id,
            sender,
            receiver,
        }
    }

    /// Publishes a snapshot to every member of the project's group except
    /// the sender. Full or closed mailboxes drop the frame silently; closed
    /// members are pruned.
    pub fn publish(
        &self,
        project_id: &ProjectId,
        exclude_client: &ClientId,
        state: &CanvasState,
    ) -> PublishOutcome {
        let mut groups = self
            .inner
            .groups
            .lock()
            .expect("broadcast hub lock poisoned");
        let Some(group) = groups.get_mut(project_id) else {
            return PublishOutcome::default();
        };

        let mut outcome = PublishOutcome::default();
        let mut closed: SmallVec<[ClientId; 4]> = SmallVec::new();
        for (client_id, sender) in group.iter() {
            if client_id == exclude_client {
                continue;
            }
            let frame = CanvasFrame {
                project_id: project_id.clone(),
                state: state.clone(),
            };
            match sender.try_send(frame) {
                Ok(()) => outcome.delivered += 1,
                Err(TrySendError::Full(_)) => outcome.dropped += 1,
                Err(TrySendError::Closed(_)) => {
                    outcome.dropped += 1;
                    closed.push(client_id.clone());
                }
            }
        }

        for client_id in closed {
            group.remove(&client_id);
        }
        if group.is_empty() {
            groups.remove(project_id);
        }
        outcome
    }

    pub fn member_count(&self, project_id: &ProjectId) -> usize {
        self.inner
            .groups
            .lock()
            .expect("broadcast hub lock poisoned")
            .get(project_id)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }
}

/// One client's membership in one project's broadcast group.
///
/// Dropping the subscription leaves the group — the implicit leave on
/// disconnect.
#[derive(Debug)]
pub struct Subscription {
    hub: Arc<HubInner>,
    client_id: ClientId,
    project_id: ProjectId,
    sender: mpsc::Sender<CanvasFrame>,
    receiver: mpsc::Receiver<CanvasFrame>,
}

impl Subscription {
    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    pub fn project_id(&self) -> &ProjectId {
        &self.project_id
    }

    pub async fn recv(&mut self) -> Option<CanvasFrame> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<CanvasFrame> {
        self.receiver.try_recv().ok()
    }

    /// Drains the queue and returns only the most recent frame; with
    /// wholesale overwrites every frame but the last is obsolete anyway.
    pub fn latest(&mut self) -> Option<CanvasFrame> {
        let mut latest = None;
        while let Some(frame) = self.try_recv() {
            latest = Some(frame);
        }
        latest
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.leave(&self.project_id, &self.client_id, &self.sender);
    }
}

#[cfg(test)]
mod tests {
    use super::{BroadcastHub, SUBSCRIPTION_BUFFER};
    use crate::model::{CanvasGraph, CanvasState, ClientId, IdAllocator, NodeKind, Position, ProjectId};

    fn ids() -> (ProjectId, ClientId, ClientId) {
        (
            ProjectId::new("p1").expect("id"),
            ClientId::new("c1").expect("id"),
            ClientId::new("c2").expect("id"),
        )
    }

    #[test]
    fn publish_reaches_other_members_but_not_the_sender() {
        let hub = BroadcastHub::new();
        let (project_id, c1, c2) = ids();
        let mut first = hub.join(c1.clone(), project_id.clone());
        let mut second = hub.join(c2.clone(), project_id.clone());

        let mut graph = CanvasGraph::new(IdAllocator::new("b").expect("allocator"));
        graph.add_node(NodeKind::Service, Position::default());
        let snapshot = graph.snapshot();

        let outcome = hub.publish(&project_id, &c1, &snapshot);
        assert_eq!(outcome.delivered, 1);
        assert_eq!(outcome.dropped, 0);

        assert!(first.try_recv().is_none());
        let frame = second.try_recv().expect("frame");
        assert_eq!(frame.project_id, project_id);
        assert_eq!(frame.state, snapshot);
    }

    #[test]
    fn publishing_into_an_empty_group_is_a_no_op() {
        let hub = BroadcastHub::new();
        let (project_id, c1, _) = ids();
        let outcome = hub.publish(&project_id, &c1, &CanvasState::default());
        assert_eq!(outcome.delivered, 0);
        assert_eq!(outcome.dropped, 0);
    }

    #[test]
    fn dropping_a_subscription_leaves_the_group() {
        let hub = BroadcastHub::new();
        let (project_id, c1, c2) = ids();
        let first = hub.join(c1, project_id.clone());
        let second = hub.join(c2, project_id.clone());
        assert_eq!(hub.member_count(&project_id), 2);

        drop(first);
        assert_eq!(hub.member_count(&project_id), 1);
        drop(second);
        assert_eq!(hub.member_count(&project_id), 0);
    }

    #[test]
    fn rejoining_replaces_the_membership_without_stale_eviction() {
        let hub = BroadcastHub::new();
        let (project_id, c1, c2) = ids();
        let stale = hub.join(c1.clone(), project_id.clone());
        let mut fresh = hub.join(c1.clone(), project_id.clone());
        assert_eq!(hub.member_count(&project_id), 1);

        // The stale subscription's drop must not evict the fresh sender.
        drop(stale);
        assert_eq!(hub.member_count(&project_id), 1);

        let outcome = hub.publish(&project_id, &c2, &CanvasState::default());
        assert_eq!(outcome.delivered, 1);
        assert!(fresh.try_recv().is_some());
    }

    #[test]
    fn full_mailboxes_drop_frames_silently() {
        let hub = BroadcastHub::new();
        let (project_id, c1, c2) = ids();
        let mut slow = hub.join(c2.clone(), project_id.clone());

        let state = CanvasState::default();
        for _ in 0..SUBSCRIPTION_BUFFER {
            let outcome = hub.publish(&project_id, &c1, &state);
            assert_eq!(outcome.delivered, 1);
        }

        let outcome = hub.publish(&project_id, &c1, &state);
        assert_eq!(outcome.delivered, 0);
        assert_eq!(outcome.dropped, 1);
        // The member stays in the group; only the frame was lost.
        assert_eq!(hub.member_count(&project_id), 1);
        assert!(slow.latest().is_some());
    }

    #[test]
    fn latest_drains_to_the_most_recent_frame() {
        let hub = BroadcastHub::new();
        let (project_id, c1, c2) = ids();
        let mut receiver = hub.join(c2, project_id.clone());

        let mut graph = CanvasGraph::new(IdAllocator::new("b").expect("allocator"));
        for _ in 0..3 {
            graph.add_node(NodeKind::Model, Position::default());
            hub.publish(&project_id, &c1, &graph.snapshot());
        }

        let frame = receiver.latest().expect("frame");
        assert_eq!(frame.state, graph.snapshot());
        assert!(receiver.try_recv().is_none());
    }

    #[tokio::test]
    async fn recv_awaits_the_next_frame() {
        let hub = BroadcastHub::new();
        let (project_id, c1, c2) = ids();
        let mut receiver = hub.join(c2, project_id.clone());

        hub.publish(&project_id, &c1, &CanvasState::default());
        let frame = receiver.recv().await.expect("frame");
        assert_eq!(frame.project_id, project_id);
    }
}
