/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Inert types that are sent around and inspected by the view service and its clients.
//!
//! [`ViewNumber`] and [`Address`] follow the newtype pattern, and [`View`] is the configuration tuple that
//! the whole service revolves around: a view number, plus the addresses of the replicas that currently hold
//! the primary and backup roles.

use borsh::{BorshDeserialize, BorshSerialize};
use std::{
    fmt::{self, Display, Formatter},
    ops::Add,
};

/// Number identifying a [`View`]. View numbers only ever increase.
///
/// View number 0 is reserved. A service that has not elected a primary yet serves view 0, and a replica
/// that pings with view number 0 is announcing that it has just started (or restarted) and knows nothing.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize,
)]
pub struct ViewNumber(u64);

impl ViewNumber {
    pub const fn new(int: u64) -> Self {
        Self(int)
    }

    /// The reserved "no view yet" view number.
    pub const fn init() -> Self {
        Self(0)
    }

    pub const fn int(&self) -> u64 {
        self.0
    }

    pub const fn is_init(&self) -> bool {
        self.0 == 0
    }
}

impl Display for ViewNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Add<u64> for ViewNumber {
    type Output = ViewNumber;
    fn add(self, rhs: u64) -> Self::Output {
        ViewNumber::new(self.0 + rhs)
    }
}

/// Opaque string naming a reachable replica endpoint. The view service never dials these; it only
/// compares them and hands them out.
#[derive(Clone, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub struct Address(String);

impl Address {
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Address::new(value)
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Address::new(value)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The two roles a replica can hold in a [`View`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Primary,
    Backup,
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Role::Primary => f.write_str("Primary"),
            Role::Backup => f.write_str("Backup"),
        }
    }
}

/// A configuration of the replica pair: which replica is primary, which is backup, and the view number
/// under which this assignment holds. An empty role is `None`.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct View {
    pub view_number: ViewNumber,
    pub primary: Option<Address>,
    pub backup: Option<Address>,
}

impl View {
    pub fn new(view_number: ViewNumber, primary: Option<Address>, backup: Option<Address>) -> Self {
        Self {
            view_number,
            primary,
            backup,
        }
    }

    /// View 0: no primary, no backup.
    pub fn initial() -> Self {
        Self::new(ViewNumber::init(), None, None)
    }

    pub fn is_primary(&self, addr: &Address) -> bool {
        self.primary.as_ref() == Some(addr)
    }

    pub fn is_backup(&self, addr: &Address) -> bool {
        self.backup.as_ref() == Some(addr)
    }

    /// The role `addr` holds in this view, if any.
    pub fn role_of(&self, addr: &Address) -> Option<Role> {
        if self.is_primary(addr) {
            Some(Role::Primary)
        } else if self.is_backup(addr) {
            Some(Role::Backup)
        } else {
            None
        }
    }

    /// The replica holding `role` in this view, if any.
    pub fn occupant(&self, role: Role) -> Option<&Address> {
        match role {
            Role::Primary => self.primary.as_ref(),
            Role::Backup => self.backup.as_ref(),
        }
    }
}

impl Default for View {
    fn default() -> Self {
        Self::initial()
    }
}

impl Display for View {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{}, {}, {}}}",
            self.view_number,
            self.primary.as_ref().map_or("-", Address::as_str),
            self.backup.as_ref().map_or("-", Address::as_str),
        )
    }
}
