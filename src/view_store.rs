/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The bounded history of views that the service has proposed, and the cursor that marks which of them is
//! currently being served.
//!
//! ## Proposed and active views
//!
//! Views are appended to the [`ViewStore`] with [`propose`](ViewStore::propose), which moves the *proposed*
//! cursor but leaves the *active* cursor (the view handed out to replicas and clients) where it is. The active
//! cursor only moves on [`advance`](ViewStore::advance), which callers gate on the current primary having
//! acknowledged the active view. Views live in a fixed-size ring addressed by the two cursors modulo
//! [`VIEW_HISTORY_LEN`].
//!
//! ## Invariants
//!
//! 1. `active_index <= proposed_index`.
//! 2. At most one proposal is outstanding (`proposed_index - active_index <= 1`). [`propose`](ViewStore::propose)
//!    refuses to append while one is, so an append never overwrites the slot of the active view.

use std::fmt::{self, Display, Formatter};

use crate::types::{View, ViewNumber};

/// Number of slots in the ring. Two is enough to hold the active view and one outstanding proposal.
pub const VIEW_HISTORY_LEN: usize = 2;

pub struct ViewStore {
    views: [View; VIEW_HISTORY_LEN],
    proposed_index: u64,
    active_index: u64,
    acked_view_number: ViewNumber,
}

impl ViewStore {
    /// Create a store whose only view is view 0.
    pub fn new() -> Self {
        Self {
            views: std::array::from_fn(|_| View::initial()),
            proposed_index: 0,
            active_index: 0,
            acked_view_number: ViewNumber::init(),
        }
    }

    /// Append `view` as the newest proposed view.
    ///
    /// Fails, leaving the store unchanged, if another proposal is still outstanding: with two slots, a
    /// second append would overwrite the active view.
    pub fn propose(&mut self, view: View) -> Result<(), ViewStoreError> {
        if self.has_pending() {
            return Err(ViewStoreError::ProposalPending {
                pending: self.proposed().view_number,
                rejected: view.view_number,
            });
        }
        self.proposed_index += 1;
        self.views[Self::slot(self.proposed_index)] = view;
        Ok(())
    }

    /// Record `ack` as the view number the current primary has acknowledged, and if a proposal is
    /// outstanding, make it the active view. Returns whether the active view changed.
    pub fn advance(&mut self, ack: ViewNumber) -> bool {
        self.acked_view_number = ack;
        if self.active_index < self.proposed_index {
            self.active_index += 1;
            true
        } else {
            false
        }
    }

    /// The view currently served to replicas and clients.
    pub fn active(&self) -> &View {
        &self.views[Self::slot(self.active_index)]
    }

    /// The most recently proposed view. Equal to [`active`](Self::active) when nothing is pending.
    pub fn proposed(&self) -> &View {
        &self.views[Self::slot(self.proposed_index)]
    }

    /// The view number the primary last confirmed operating under.
    pub fn acked_view_number(&self) -> ViewNumber {
        self.acked_view_number
    }

    /// Whether the active view has been acknowledged by its primary.
    pub fn is_active_acked(&self) -> bool {
        self.acked_view_number == self.active().view_number
    }

    pub fn has_pending(&self) -> bool {
        self.active_index < self.proposed_index
    }

    fn slot(index: u64) -> usize {
        (index % VIEW_HISTORY_LEN as u64) as usize
    }
}

impl Default for ViewStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Enumerates the ways a [`ViewStore`] operation can fail.
#[derive(Debug, PartialEq, Eq)]
pub enum ViewStoreError {
    /// A view was proposed while an earlier proposal had not become active yet.
    ProposalPending { pending: ViewNumber, rejected: ViewNumber },
}

impl Display for ViewStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ViewStoreError::ProposalPending { pending, rejected } => write!(
                f,
                "cannot propose view {} while view {} is still pending",
                rejected, pending
            ),
        }
    }
}

impl std::error::Error for ViewStoreError {}
