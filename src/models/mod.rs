// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod donation;
pub mod matching;
pub mod profile;
pub mod user;
pub mod violation;

pub use donation::{Donation, DonationStatus, FoodType, QuantityUnit, StorageRequirement};
pub use matching::{Matching, MatchingStatus};
pub use profile::{Business, FoodBank};
pub use user::{Capability, Role, User, UserResponse};
pub use violation::{Violation, ViolationStatus};
