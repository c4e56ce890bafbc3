//! Core types and configuration for the Ebbtide TAXII server.

pub mod config;
pub mod entities;
pub mod stix;

pub use config::{
    ApiRootServer, ApiRootService, AuthConfig, CollectionsService, ConfigError, DiscoveryServer,
    DiscoveryService, GlobalConfig, HtmlConfig, LoggingConfig, ServerConfig,
};
pub use entities::{
    ApiRoot, Collection, CollectionView, DATETIME_FORMAT, Discovery, parse_taxii_timestamp,
    taxii2_datetimeformat,
};
pub use stix::{DecodeError, StixObject, is_valid_stix_id, is_valid_stix_type};
