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

//! Resolution of references to objects living outside the serialized graph.
//!
//! The host supplies resolvers for up to three addressing schemes: integer
//! index, GUID and string key. On the write side a resolver recognises a
//! value it can address; on the read side it turns the key back into the
//! value. Resolvers are consulted in chain order, following each resolver's
//! own [`next`](ExternalReferenceResolver::next) link before moving on.

use std::any::Any;
use std::sync::Arc;

use uuid::Uuid;

pub trait ExternalReferenceResolver<K>: Send + Sync {
    /// The key under which `value` can be referenced, if any. `value` is the
    /// shell being written (an `Rc<...>` or `Arc<...>`).
    fn can_reference(&self, value: &dyn Any) -> Option<K>;

    /// The object addressed by `key`, as the shell type that was written.
    fn try_resolve(&self, key: &K) -> Option<Box<dyn Any>>;

    fn next(&self) -> Option<&dyn ExternalReferenceResolver<K>> {
        None
    }
}

pub type IndexReferenceResolver = dyn ExternalReferenceResolver<i32>;
pub type GuidReferenceResolver = dyn ExternalReferenceResolver<Uuid>;
pub type StringReferenceResolver = dyn ExternalReferenceResolver<String>;

/// Ordered resolvers for one addressing scheme.
pub struct ResolverChain<K> {
    resolvers: Vec<Arc<dyn ExternalReferenceResolver<K>>>,
}

impl<K> Default for ResolverChain<K> {
    fn default() -> Self {
        ResolverChain {
            resolvers: Vec::new(),
        }
    }
}

impl<K> Clone for ResolverChain<K> {
    fn clone(&self) -> Self {
        ResolverChain {
            resolvers: self.resolvers.clone(),
        }
    }
}

impl<K> ResolverChain<K> {
    pub fn push(&mut self, resolver: Arc<dyn ExternalReferenceResolver<K>>) {
        self.resolvers.push(resolver);
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    pub fn clear(&mut self) {
        self.resolvers.clear();
    }

    fn find_map<R>(&self, mut f: impl FnMut(&dyn ExternalReferenceResolver<K>) -> Option<R>) -> Option<R> {
        for head in &self.resolvers {
            let mut current: Option<&dyn ExternalReferenceResolver<K>> = Some(head.as_ref());
            while let Some(resolver) = current {
                if let Some(found) = f(resolver) {
                    return Some(found);
                }
                current = resolver.next();
            }
        }
        None
    }

    pub fn can_reference(&self, value: &dyn Any) -> Option<K> {
        self.find_map(|r| r.can_reference(value))
    }

    pub fn try_resolve(&self, key: &K) -> Option<Box<dyn Any>> {
        self.find_map(|r| r.try_resolve(key))
    }
}

/// The three chains of one session.
#[derive(Default, Clone)]
pub struct ExternalResolvers {
    pub index: ResolverChain<i32>,
    pub guid: ResolverChain<Uuid>,
    pub string: ResolverChain<String>,
}

impl ExternalResolvers {
    pub fn clear(&mut self) {
        self.index.clear();
        self.guid.clear();
        self.string.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty() && self.guid.is_empty() && self.string.is_empty()
    }
}
