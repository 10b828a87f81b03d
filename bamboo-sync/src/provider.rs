//! Per-evaluation provider for one artifact resource.
//!
//! An [`ArtifactProvider`] lives for exactly one evaluation cycle. It owns
//! the cycle's caches: the resolver outcome and the metadata record, both
//! loaded lazily on first use. Property reads never touch the network; the
//! `build` in-sync check is the only read that may query the server.

use std::path::Path;

use bamboo_core::{ArtifactSpec, BuildSelector, Ensure};

use crate::companion::{self, Relationship};
use crate::error::SyncError;
use crate::http::HttpClient;
use crate::installer::{self, Installed};
use crate::meta_store::{self, LocalMetadata};
use crate::property::{build_in_sync, Comparator, Property, PropertyValue};
use crate::resolver::{BuildResolver, LatestBuild};

pub struct ArtifactProvider<'a, C: HttpClient + ?Sized> {
    spec: &'a ArtifactSpec,
    client: &'a C,
    resolver: BuildResolver,
    meta: Option<LocalMetadata>,
}

impl<'a, C: HttpClient + ?Sized> ArtifactProvider<'a, C> {
    pub fn new(spec: &'a ArtifactSpec, client: &'a C) -> Self {
        Self {
            spec,
            client,
            resolver: BuildResolver::new(spec.server.clone(), spec.plan.clone()),
            meta: None,
        }
    }

    pub fn spec(&self) -> &ArtifactSpec {
        self.spec
    }

    /// The target exists as a regular file.
    pub fn exists(&self) -> bool {
        self.spec.path.is_file()
    }

    /// Cached metadata, loaded from disk on first access.
    pub fn metadata(&mut self) -> &LocalMetadata {
        let spec = self.spec;
        self.meta.get_or_insert_with(|| meta_store::load(&spec.path))
    }

    /// Current value of `property`, served from cached metadata.
    pub fn property(&mut self, property: Property) -> Option<PropertyValue> {
        property.read(self.metadata())
    }

    /// Setters are no-ops: changes are made on [`flush`](Self::flush), which
    /// reads the desired values straight from the [`ArtifactSpec`].
    pub fn set_property(&mut self, property: Property, value: &PropertyValue) {
        tracing::debug!("{property} will change to {value} on flush");
    }

    /// Latest-build outcome, memoized for this evaluation.
    pub fn latest_build(&mut self) -> Result<LatestBuild, SyncError> {
        self.resolver.latest(self.client)
    }

    /// Whether `property` already matches its desired value.
    pub fn insync(&mut self, property: Property) -> Result<bool, SyncError> {
        match property.comparator() {
            Comparator::Structural => {
                let should = property.should(self.spec);
                Ok(self.property(property).as_ref() == Some(&should))
            }
            Comparator::BuildAware => {
                let current = self.metadata().build;
                let desired = self.spec.build;
                let resolver = &mut self.resolver;
                let client = self.client;
                build_in_sync(desired, current, || resolver.latest(client))
            }
        }
    }

    /// Concrete build number to install. A skipped latest build is fatal here
    /// because an install was explicitly requested.
    pub fn desired_build_number(&mut self) -> Result<u64, SyncError> {
        match self.spec.build {
            BuildSelector::Number(n) => Ok(n),
            BuildSelector::Latest => match self.latest_build()? {
                LatestBuild::Successful(n) => Ok(n),
                LatestBuild::Skip { number, state } => {
                    Err(SyncError::BuildNotSuccessful { number, state })
                }
            },
        }
    }

    /// Everything happens on flush.
    pub fn create(&mut self) {
        tracing::debug!("create {}: deferred to flush", self.spec.path.display());
    }

    /// Removal is carried out by the companion file resources.
    pub fn destroy(&mut self) {
        tracing::debug!(
            "destroy {}: delegated to file resources",
            self.spec.path.display()
        );
    }

    /// Apply the desired state. Returns `None` when `ensure` is absent.
    pub fn flush(&mut self) -> Result<Option<Installed>, SyncError> {
        if self.spec.ensure != Ensure::Present {
            return Ok(None);
        }
        let build = self.desired_build_number()?;
        let installed = installer::install(self.client, self.spec, build)?;
        self.meta = Some(installed.metadata.clone());
        Ok(Some(installed))
    }

    /// Companion file resources to hand back to the host.
    pub fn companion_resources(&self, host_manages: impl Fn(&Path) -> bool) -> Vec<Relationship> {
        companion::companion_resources(self.spec, host_manages)
    }

    pub fn required_users(&self) -> Vec<String> {
        companion::required_users(self.spec)
    }
}
