// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Member selection policies.
//!
//! A policy is identified by a stable id so that the id can be stored next
//! to serialized data and the policy looked back up with [`Policies::by_id`].

use std::sync::{Arc, OnceLock};

use crate::serializer::MemberInfo;

pub trait SerializationPolicy: Send + Sync {
    fn id(&self) -> &str;

    /// Whether types without the `#[weave(serializable)]` marker may be
    /// serialized member by member.
    fn allow_non_marked_types(&self) -> bool;

    fn should_serialize_member(&self, member: &MemberInfo) -> bool;
}

pub type PolicyRef = Arc<dyn SerializationPolicy>;

/// Every member that is not explicitly skipped.
#[derive(Debug, Default)]
pub struct Everything;

impl SerializationPolicy for Everything {
    fn id(&self) -> &str {
        Policies::EVERYTHING_ID
    }

    fn allow_non_marked_types(&self) -> bool {
        true
    }

    fn should_serialize_member(&self, member: &MemberInfo) -> bool {
        !member.skipped
    }
}

/// Only members marked `#[weave(serialize)]`, on marked types.
#[derive(Debug, Default)]
pub struct Strict;

impl SerializationPolicy for Strict {
    fn id(&self) -> &str {
        Policies::STRICT_ID
    }

    fn allow_non_marked_types(&self) -> bool {
        false
    }

    fn should_serialize_member(&self, member: &MemberInfo) -> bool {
        member.marked && !member.skipped
    }
}

/// Public members, plus private ones marked `#[weave(serialize)]`.
#[derive(Debug, Default)]
pub struct PublicOrMarked;

impl SerializationPolicy for PublicOrMarked {
    fn id(&self) -> &str {
        Policies::PUBLIC_OR_MARKED_ID
    }

    fn allow_non_marked_types(&self) -> bool {
        true
    }

    fn should_serialize_member(&self, member: &MemberInfo) -> bool {
        (member.is_public || member.marked) && !member.skipped
    }
}

/// Access to the built-in policies.
pub struct Policies;

impl Policies {
    pub const EVERYTHING_ID: &'static str = "weave.everything";
    pub const STRICT_ID: &'static str = "weave.strict";
    pub const PUBLIC_OR_MARKED_ID: &'static str = "weave.public_or_marked";

    pub fn everything() -> PolicyRef {
        static POLICY: OnceLock<PolicyRef> = OnceLock::new();
        POLICY.get_or_init(|| Arc::new(Everything)).clone()
    }

    pub fn strict() -> PolicyRef {
        static POLICY: OnceLock<PolicyRef> = OnceLock::new();
        POLICY.get_or_init(|| Arc::new(Strict)).clone()
    }

    pub fn public_or_marked() -> PolicyRef {
        static POLICY: OnceLock<PolicyRef> = OnceLock::new();
        POLICY.get_or_init(|| Arc::new(PublicOrMarked)).clone()
    }

    pub fn by_id(id: &str) -> Option<PolicyRef> {
        match id {
            Self::EVERYTHING_ID => Some(Self::everything()),
            Self::STRICT_ID => Some(Self::strict()),
            Self::PUBLIC_OR_MARKED_ID => Some(Self::public_or_marked()),
            _ => None,
        }
    }
}
