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
//! Member-based codecs: a type written as one named entry per member.
//!
//! [`CompiledMemberCodec`] applies the policy once, when the codec is
//! built. [`ReflectionMemberCodec`] walks the member list and asks the
//! policy on every call; it is what the locator builds when precompiled
//! codecs are switched off.
//!
//! Each member is its own containment boundary. Reading accepts members in
//! any order, skips names it does not know, and reads each member at most
//! once.

use std::marker::PhantomData;

use crate::error::Error;
use crate::policy::PolicyRef;
use crate::resolver::context::{DeserializationContext, SerializationContext};
use crate::serializer::base::contain;
use crate::serializer::{Codec, FromPolicy, Member, Serializable};
use crate::stream::{DataReader, DataWriter, EntryType};

/// The members of `T` that `policy` lets through.
pub fn eligible<T: Serializable>(policy: &PolicyRef) -> Vec<Member<T>> {
    T::members()
        .into_iter()
        .filter(|member| policy.should_serialize_member(&member.info))
        .collect()
}

pub fn write_members<T: Serializable>(
    members: &[Member<T>],
    value: &T,
    writer: &mut dyn DataWriter,
    context: &mut SerializationContext,
) -> Result<(), Error> {
    for member in members {
        let result = (member.write)(value, writer, context);
        contain(result, context.debug_mut())?;
    }
    Ok(())
}

pub fn read_members<T: Serializable>(
    members: &[Member<T>],
    value: &mut T,
    reader: &mut dyn DataReader,
    context: &mut DeserializationContext,
) -> Result<(), Error> {
    read_members_with(members, value, reader, context, |_, _, _, _| Ok(false))
}

/// [`read_members`] with a handler for unnamed entries, which returns
/// whether it consumed the entry.
pub fn read_members_with<T: Serializable>(
    members: &[Member<T>],
    value: &mut T,
    reader: &mut dyn DataReader,
    context: &mut DeserializationContext,
    mut unnamed: impl FnMut(
        &mut T,
        EntryType,
        &mut dyn DataReader,
        &mut DeserializationContext,
    ) -> Result<bool, Error>,
) -> Result<(), Error> {
    let mut seen = vec![false; members.len()];
    loop {
        let (entry, name) = reader.peek_named();
        if entry.is_boundary() {
            return Ok(());
        }
        let Some(name) = name else {
            if !unnamed(value, entry, reader, context)? {
                reader.skip_entry();
            }
            continue;
        };
        match members.iter().position(|member| member.matches(&name)) {
            Some(index) if !seen[index] => {
                seen[index] = true;
                let result = (members[index].read)(value, reader, context);
                contain(result, context.debug_mut())?;
            }
            Some(_) => {
                log::debug!("member `{name}` of {} read twice; skipping", T::type_of());
                reader.skip_entry();
            }
            None => {
                log::debug!("skipping unknown member `{name}` of {}", T::type_of());
                reader.skip_entry();
            }
        }
    }
}

pub struct CompiledMemberCodec<T> {
    members: Vec<Member<T>>,
}

impl<T: Serializable> CompiledMemberCodec<T> {
    pub fn new(policy: &PolicyRef) -> Self {
        CompiledMemberCodec {
            members: eligible(policy),
        }
    }

    pub fn members(&self) -> &[Member<T>] {
        &self.members
    }
}

impl<T: Serializable> FromPolicy for CompiledMemberCodec<T> {
    fn from_policy(policy: &PolicyRef) -> Self {
        Self::new(policy)
    }
}

impl<T: Serializable> Codec<T> for CompiledMemberCodec<T> {
    fn write_impl(
        &self,
        value: &T,
        writer: &mut dyn DataWriter,
        context: &mut SerializationContext,
    ) -> Result<(), Error> {
        write_members(&self.members, value, writer, context)
    }

    fn read_impl(
        &self,
        value: &mut T,
        reader: &mut dyn DataReader,
        context: &mut DeserializationContext,
    ) -> Result<(), Error> {
        read_members(&self.members, value, reader, context)
    }
}

pub struct ReflectionMemberCodec<T> {
    policy: PolicyRef,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Serializable> ReflectionMemberCodec<T> {
    pub fn new(policy: PolicyRef) -> Self {
        ReflectionMemberCodec {
            policy,
            _marker: PhantomData,
        }
    }
}

impl<T: Serializable> Codec<T> for ReflectionMemberCodec<T> {
    fn write_impl(
        &self,
        value: &T,
        writer: &mut dyn DataWriter,
        context: &mut SerializationContext,
    ) -> Result<(), Error> {
        write_members(&eligible(&self.policy), value, writer, context)
    }

    fn read_impl(
        &self,
        value: &mut T,
        reader: &mut dyn DataReader,
        context: &mut DeserializationContext,
    ) -> Result<(), Error> {
        read_members(&eligible(&self.policy), value, reader, context)
    }
}
