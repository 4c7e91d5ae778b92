/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Exhaustive enumerations around every message variant exchanged with the view service.

use borsh::{BorshDeserialize, BorshSerialize};

use crate::types::{Address, View, ViewNumber};

/// All requests the view service answers.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum ViewServiceRequest {
    /// See: [`Ping`].
    Ping(Ping),

    /// Ask for the active view, without heartbeating.
    Get,
}

/// Heartbeat from a replica: "I am `me`, and the last view I adopted is `view_number`".
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Ping {
    pub me: Address,
    pub view_number: ViewNumber,
}

impl From<Ping> for ViewServiceRequest {
    fn from(value: Ping) -> Self {
        ViewServiceRequest::Ping(value)
    }
}

/// Replies, one variant per request variant. Both carry the active view.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum ViewServiceResponse {
    Ping(View),
    Get(View),
}

impl ViewServiceResponse {
    /// Get the view carried by the response.
    pub fn view(&self) -> &View {
        match self {
            ViewServiceResponse::Ping(view) => view,
            ViewServiceResponse::Get(view) => view,
        }
    }

    /// Whether this response is the kind of reply `request` expects.
    pub fn answers(&self, request: &ViewServiceRequest) -> bool {
        matches!(
            (request, self),
            (ViewServiceRequest::Ping(_), ViewServiceResponse::Ping(_))
                | (ViewServiceRequest::Get, ViewServiceResponse::Get(_))
        )
    }
}
