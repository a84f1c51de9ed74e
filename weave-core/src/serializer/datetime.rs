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
//! Dates, times and durations, each a node holding one unnamed integer:
//! days since the Unix epoch for dates, microseconds otherwise.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};

use crate::error::Error;
use crate::resolver::context::{DeserializationContext, SerializationContext};
use crate::resolver::registry::TypeRegistry;
use crate::serializer::{Capabilities, Codec, Serializable};
use crate::stream::{DataReader, DataWriter};
use crate::types::{Type, TypeDefinition};
use crate::util::EPOCH;

macro_rules! impl_temporal {
    ($ty:ty, $name:literal, $codec:ident, $default:expr, $to:expr, $from:expr) => {
        #[derive(Default)]
        pub struct $codec;

        impl Codec<$ty> for $codec {
            fn write_impl(
                &self,
                value: &$ty,
                writer: &mut dyn DataWriter,
                _context: &mut SerializationContext,
            ) -> Result<(), Error> {
                let raw: Option<i64> = ($to)(value);
                match raw {
                    Some(raw) => {
                        writer.write_i64(None, raw);
                        Ok(())
                    }
                    None => Err(Error::invalid_data(format!(
                        "{} {value} is out of the representable range",
                        $name
                    ))),
                }
            }

            fn read_impl(
                &self,
                value: &mut $ty,
                reader: &mut dyn DataReader,
                context: &mut DeserializationContext,
            ) -> Result<(), Error> {
                let read: Option<$ty> = reader.read_i64().and_then($from);
                match read {
                    Some(read) => {
                        *value = read;
                        Ok(())
                    }
                    None => context.log_warning(format!("expected a valid {}", $name)),
                }
            }
        }

        impl Serializable for $ty {
            fn type_of() -> Type {
                Type::named(TypeDefinition::core($name))
            }

            fn create_default() -> Self {
                $default
            }

            fn capabilities() -> Capabilities<Self> {
                Capabilities::new().builtin::<$codec>()
            }
        }
    };
}

impl_temporal!(
    NaiveDate,
    "Date",
    DateCodec,
    EPOCH,
    |date: &NaiveDate| Some((*date - EPOCH).num_days()),
    |days| EPOCH.checked_add_signed(TimeDelta::try_days(days)?)
);

impl_temporal!(
    NaiveDateTime,
    "NaiveDateTime",
    NaiveDateTimeCodec,
    NaiveDateTime::default(),
    |time: &NaiveDateTime| Some(time.and_utc().timestamp_micros()),
    |micros| DateTime::from_timestamp_micros(micros).map(|time| time.naive_utc())
);

impl_temporal!(
    DateTime<Utc>,
    "DateTime",
    DateTimeCodec,
    DateTime::<Utc>::default(),
    |time: &DateTime<Utc>| Some(time.timestamp_micros()),
    DateTime::from_timestamp_micros
);

impl_temporal!(
    TimeDelta,
    "Duration",
    DurationCodec,
    TimeDelta::zero(),
    |duration: &TimeDelta| duration.num_microseconds(),
    |micros| Some(TimeDelta::microseconds(micros))
);

pub(crate) fn register(registry: &TypeRegistry) {
    registry.register::<NaiveDate>();
    registry.register::<NaiveDateTime>();
    registry.register::<DateTime<Utc>>();
    registry.register::<TimeDelta>();
}
