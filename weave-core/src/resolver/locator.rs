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
//! Codec resolution.
//!
//! The locator answers "which codec writes `T` under this policy" and
//! caches the answer per `(policy, emit flag, type)`. Creation happens under
//! one lock with a re-check, so concurrent callers asking for the same key
//! all receive the same codec instance.
//!
//! Resolution order:
//!
//! 1. resolver hooks added with [`Locator::add_resolver`], in order;
//! 2. the type's own self-format codec, when it asks to always use it;
//! 3. codecs registered for the exact type, highest priority first;
//! 4. open-generic factories for the type's definition, highest priority
//!    first;
//! 5. the built-in codec of a std type;
//! 6. structural codecs, in [`Shape`] order;
//! 7. member codecs: precompiled when the emit flag is on, reflection
//!    otherwise. Types without the serializable marker only get one when
//!    the policy allows non-marked types.
//!
//! Built-in codec constructors never call back into the locator. User hooks
//! and factories may: a thread already building a codec in a locator does
//! not take its lock again.

use std::any::{Any, TypeId};
use std::cell::Cell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use dashmap::DashMap;

use crate::error::Error;
use crate::policy::PolicyRef;
use crate::resolver::registry::TypeRegistry;
use crate::serializer::member::{CompiledMemberCodec, ReflectionMemberCodec};
use crate::serializer::{Codec, ErasedCodec, Serializable, Shape, TypedCodec};
use crate::types::{Type, TypeDefinition};

/// A located codec of either flavor.
#[derive(Clone)]
pub enum CodecHandle {
    /// Holds an `Arc<dyn Codec<T>>`.
    Typed(Arc<dyn Any + Send + Sync>),
    Erased(Arc<dyn ErasedCodec>),
}

impl CodecHandle {
    pub fn typed<T: Serializable>(codec: Arc<dyn Codec<T>>) -> CodecHandle {
        CodecHandle::Typed(Arc::new(codec))
    }

    pub fn erased(codec: Arc<dyn ErasedCodec>) -> CodecHandle {
        CodecHandle::Erased(codec)
    }

    /// The codec as a codec of `T`. A typed handle for another type gives
    /// `None`; an erased one is trusted and wrapped.
    pub fn to_typed<T: Serializable>(&self) -> Option<Arc<dyn Codec<T>>> {
        match self {
            CodecHandle::Typed(any) => any.downcast_ref::<Arc<dyn Codec<T>>>().cloned(),
            CodecHandle::Erased(codec) => Some(Arc::new(TypedCodec::<T>::new(codec.clone()))),
        }
    }
}

/// A hook consulted before any other resolution step.
///
/// Hooks run while the locator builds a codec. They may ask the same
/// locator for codecs of other types, but must not register codecs or ask
/// for the type being resolved.
pub trait CodecResolver: Send + Sync {
    fn resolve(&self, ty: &Type, type_id: TypeId, policy: &PolicyRef) -> Option<CodecHandle>;
}

/// Builds codecs for the closed forms of one generic definition, for
/// example one factory serving every `Pair[A,B]`.
///
/// The same rules as for [`CodecResolver`] apply: element codecs may be
/// looked up, registrations may not happen from inside `create`.
pub trait GenericCodecFactory: Send + Sync {
    /// A codec for the closed type `ty`, or `None` to let later steps try.
    fn create(&self, ty: &Type, registry: &TypeRegistry) -> Option<Arc<dyn ErasedCodec>>;
}

struct Prioritized<C> {
    priority: i32,
    codec: C,
}

fn insert_prioritized<C>(
    entries: &mut Vec<Prioritized<C>>,
    priority: i32,
    codec: C,
    describe: impl FnOnce() -> String,
) -> Result<(), Error> {
    if entries.iter().any(|e| e.priority == priority) {
        return Err(Error::not_allowed(format!(
            "{} is already registered with priority {priority}",
            describe()
        )));
    }
    entries.push(Prioritized { priority, codec });
    entries.sort_by(|a, b| b.priority.cmp(&a.priority));
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
    policy: u32,
    emitted: bool,
    type_id: TypeId,
}

thread_local! {
    /// Address of the locator this thread is building a codec in, or 0.
    static CREATING_IN: Cell<usize> = const { Cell::new(0) };
}

/// Marks the current thread as building a codec until dropped.
struct Creating {
    previous: usize,
}

impl Creating {
    fn enter(locator: &Locator) -> Creating {
        let address = locator as *const Locator as usize;
        Creating {
            previous: CREATING_IN.with(|cell| cell.replace(address)),
        }
    }

    fn is_active(locator: &Locator) -> bool {
        CREATING_IN.with(|cell| cell.get() == locator as *const Locator as usize)
    }
}

impl Drop for Creating {
    fn drop(&mut self) {
        CREATING_IN.with(|cell| cell.set(self.previous));
    }
}

#[derive(Default)]
pub struct Locator {
    hooks: RwLock<Vec<Arc<dyn CodecResolver>>>,
    exact: RwLock<HashMap<TypeId, Vec<Prioritized<CodecHandle>>>>,
    generic: RwLock<HashMap<TypeDefinition, Vec<Prioritized<Arc<dyn GenericCodecFactory>>>>>,
    policy_slots: DashMap<String, u32>,
    next_slot: AtomicU32,
    cache: DashMap<CacheKey, CodecHandle>,
    create_lock: Mutex<()>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl Locator {
    pub fn new() -> Locator {
        Locator::default()
    }

    /// The process-wide locator.
    pub fn global() -> Arc<Locator> {
        static GLOBAL: OnceLock<Arc<Locator>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(Locator::new())).clone()
    }

    pub fn add_resolver(&self, resolver: Arc<dyn CodecResolver>) {
        let _guard = self.create_lock.lock().unwrap_or_else(PoisonError::into_inner);
        write(&self.hooks).push(resolver);
        self.cache.clear();
    }

    /// Registers `codec` for `T`. Two registrations of one type with the
    /// same priority are rejected.
    pub fn register_codec<T: Serializable>(
        &self,
        codec: Arc<dyn Codec<T>>,
        priority: i32,
    ) -> Result<(), Error> {
        let _guard = self.create_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut exact = write(&self.exact);
        let entries = exact.entry(TypeId::of::<T>()).or_default();
        insert_prioritized(entries, priority, CodecHandle::typed(codec), || {
            format!("a codec for {}", T::type_of())
        })?;
        drop(exact);
        self.cache.clear();
        Ok(())
    }

    /// Registers `factory` for every closed form of `definition`.
    pub fn register_generic_codec(
        &self,
        definition: TypeDefinition,
        factory: Arc<dyn GenericCodecFactory>,
        priority: i32,
    ) -> Result<(), Error> {
        let _guard = self.create_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut generic = write(&self.generic);
        let description = format!("a generic codec for `{}`", definition.path());
        let entries = generic.entry(definition).or_default();
        insert_prioritized(entries, priority, factory, || description)?;
        drop(generic);
        self.cache.clear();
        Ok(())
    }

    fn policy_slot(&self, policy: &PolicyRef) -> u32 {
        if let Some(slot) = self.policy_slots.get(policy.id()) {
            return *slot;
        }
        *self
            .policy_slots
            .entry(policy.id().to_owned())
            .or_insert_with(|| self.next_slot.fetch_add(1, Ordering::Relaxed))
    }

    #[inline(always)]
    fn cached<T: Serializable>(&self, key: &CacheKey) -> Option<Arc<dyn Codec<T>>> {
        self.cache.get(key).and_then(|handle| handle.to_typed::<T>())
    }

    /// The codec for `T` under `policy`.
    pub fn get<T: Serializable>(
        &self,
        policy: &PolicyRef,
        emit: bool,
    ) -> Result<Arc<dyn Codec<T>>, Error> {
        let key = CacheKey {
            policy: self.policy_slot(policy),
            emitted: emit,
            type_id: TypeId::of::<T>(),
        };
        if let Some(codec) = self.cached::<T>(&key) {
            return Ok(codec);
        }
        // A hook or factory asking for an element codec already holds the lock.
        let _guard = (!Creating::is_active(self))
            .then(|| self.create_lock.lock().unwrap_or_else(PoisonError::into_inner));
        if let Some(codec) = self.cached::<T>(&key) {
            return Ok(codec);
        }
        TypeRegistry::global().ensure::<T>();
        let codec = {
            let _creating = Creating::enter(self);
            self.create::<T>(policy, emit)?
        };
        self.cache.insert(key, CodecHandle::typed(codec.clone()));
        Ok(codec)
    }

    /// Number of cached codecs.
    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    fn create<T: Serializable>(
        &self,
        policy: &PolicyRef,
        emit: bool,
    ) -> Result<Arc<dyn Codec<T>>, Error> {
        let ty = T::type_of();
        if T::PRIMITIVE {
            crate::not_allowed!("{} is written inline and has no codec", ty);
        }
        let type_id = TypeId::of::<T>();

        for hook in read(&self.hooks).iter() {
            let Some(handle) = hook.resolve(&ty, type_id, policy) else {
                continue;
            };
            match handle.to_typed::<T>() {
                Some(codec) => {
                    log::debug!("resolver hook supplied the codec for {ty}");
                    return Ok(codec);
                }
                None => log::warn!("resolver hook returned a codec of another type for {ty}"),
            }
        }

        let capabilities = T::capabilities();
        if capabilities.always_self_format {
            if let Some(factory) = capabilities.find(Shape::SelfFormat) {
                return Ok(factory(policy));
            }
        }

        if let Some(entries) = read(&self.exact).get(&type_id) {
            if let Some(codec) = entries.iter().find_map(|e| e.codec.to_typed::<T>()) {
                return Ok(codec);
            }
        }

        if let Some(definition) = ty.definition().filter(|_| ty.is_generic()) {
            if let Some(entries) = read(&self.generic).get(definition) {
                let registry = TypeRegistry::global();
                if let Some(erased) = entries.iter().find_map(|e| e.codec.create(&ty, registry)) {
                    log::debug!("generic factory of `{}` built the codec for {ty}", definition.path());
                    return Ok(Arc::new(TypedCodec::<T>::new(erased)));
                }
            }
        }

        if let Some(builtin) = capabilities.builtin {
            return Ok(builtin(policy));
        }

        if let Some((shape, factory)) = capabilities.structural().into_iter().next() {
            log::debug!("using the {shape:?} codec for {ty}");
            return Ok(factory(policy));
        }

        if !T::is_marked() && !policy.allow_non_marked_types() {
            crate::not_allowed!(
                "{} is not marked serializable and policy `{}` only writes marked types",
                ty,
                policy.id()
            );
        }
        log::debug!(
            "building a {} member codec for {ty} under policy `{}`",
            if emit { "compiled" } else { "reflection" },
            policy.id()
        );
        if emit {
            Ok(Arc::new(CompiledMemberCodec::<T>::new(policy)))
        } else {
            Ok(Arc::new(ReflectionMemberCodec::<T>::new(policy.clone())))
        }
    }
}
