//! Property Cache - inline caches for the property-access fast path
//!
//! This component provides:
//! - Inline cache chains with mono/poly/megamorphic states ([`InlineCache`])
//! - Receiver guards and cache entries for reads and presence checks
//! - Uncached (megamorphic) property resolution
//! - Object literal install caches ([`LiteralInstallCache`], [`ObjectLiteral`])
//! - Construction shape caches ([`ConstructShapeCache`])
//! - The per-site entry points used by the execution engine ([`PropertyAccess`])

pub mod access;
pub mod config;
pub mod construct;
pub mod entry;
mod generic;
pub mod guard;
pub mod host;
pub mod inline_cache;
pub mod object_literal;
pub mod realm;
pub mod site;

// Re-export main types
pub use access::{PropertyAccess, SiteId, SiteKind};
pub use config::{CacheConfig, ConfigError};
pub use construct::ConstructShapeCache;
pub use entry::{CacheEntry, EntryAction, LookupMode};
pub use guard::{GuardMatch, ReceiverGuard, ShapePath};
pub use host::{Host, NoHost};
pub use inline_cache::{CacheState, InlineCache, PublishCell, MAX_POLYMORPHIC_ENTRIES};
pub use object_literal::{InstallEntry, LiteralInstallCache, LiteralMember, MemberValue, ObjectLiteral};
pub use realm::Intrinsics;
pub use site::{PropertySite, SiteStats};
