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
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::resolver::context::{DeserializationContext, SerializationContext};
use crate::resolver::registry::TypeRegistry;
use crate::serializer::complex::for_each_named;
use crate::serializer::{Capabilities, Codec, Serializable};
use crate::stream::{DataReader, DataWriter};
use crate::types::{Type, TypeDefinition};

/// A four-part version number; `build` and `revision` are optional.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub build: Option<u32>,
    pub revision: Option<u32>,
}

impl Version {
    pub fn new(major: u32, minor: u32) -> Self {
        Version {
            major,
            minor,
            build: None,
            revision: None,
        }
    }

    pub fn with_build(mut self, build: u32) -> Self {
        self.build = Some(build);
        self
    }

    pub fn with_revision(mut self, revision: u32) -> Self {
        self.revision = Some(revision);
        self
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if let Some(build) = self.build {
            write!(f, ".{build}")?;
            if let Some(revision) = self.revision {
                write!(f, ".{revision}")?;
            }
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let invalid = || Error::invalid_data(format!("`{s}` is not a version"));
        let parts = s
            .split('.')
            .map(|part| part.parse::<u32>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;
        match parts.as_slice() {
            [major, minor] => Ok(Version::new(*major, *minor)),
            [major, minor, build] => Ok(Version::new(*major, *minor).with_build(*build)),
            [major, minor, build, revision] => Ok(Version::new(*major, *minor)
                .with_build(*build)
                .with_revision(*revision)),
            _ => Err(invalid()),
        }
    }
}

#[derive(Default)]
pub struct VersionCodec;

impl Codec<Version> for VersionCodec {
    fn write_impl(
        &self,
        value: &Version,
        writer: &mut dyn DataWriter,
        _context: &mut SerializationContext,
    ) -> Result<(), Error> {
        writer.write_u64(Some("major"), value.major.into());
        writer.write_u64(Some("minor"), value.minor.into());
        if let Some(build) = value.build {
            writer.write_u64(Some("build"), build.into());
        }
        if let Some(revision) = value.revision {
            writer.write_u64(Some("revision"), revision.into());
        }
        Ok(())
    }

    fn read_impl(
        &self,
        value: &mut Version,
        reader: &mut dyn DataReader,
        context: &mut DeserializationContext,
    ) -> Result<(), Error> {
        for_each_named(reader, context, |name, reader, context| {
            let slot = match name {
                "major" => &mut value.major,
                "minor" => &mut value.minor,
                "build" => value.build.insert(0),
                "revision" => value.revision.insert(0),
                _ => return Ok(false),
            };
            *slot = u32::read_value(reader, context)?;
            Ok(true)
        })
    }
}

impl Serializable for Version {
    fn type_of() -> Type {
        Type::named(TypeDefinition::core("Version"))
    }

    fn create_default() -> Self {
        Version::default()
    }

    fn capabilities() -> Capabilities<Self> {
        Capabilities::new().builtin::<VersionCodec>()
    }
}

pub(crate) fn register(registry: &TypeRegistry) {
    registry.register::<Version>();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_prints() {
        let version: Version = "1.2.3".parse().unwrap();
        assert_eq!(version, Version::new(1, 2).with_build(3));
        assert_eq!(version.to_string(), "1.2.3");
        assert!("1".parse::<Version>().is_err());
        assert!("1.x".parse::<Version>().is_err());
    }
}
