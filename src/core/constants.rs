//! Constants used throughout pass-secret-service.
//!
//! Centralizes wire names, object path fragments and on-disk layout names.

/// Well-known bus name claimed by the daemon.
pub const BUS_NAME: &str = "org.freedesktop.secrets";

/// Default base of every exported object path.
pub const BASE_PATH: &str = "/org/freedesktop/secrets";

/// The root object path.
///
/// Returned as the prompt of every operation (no prompt needed) and as
/// the "no object" value of `ReadAlias`/`SetAlias`.
pub const ROOT_PATH: &str = "/";

/// Path segment under which collections are exported.
pub const COLLECTION_SEGMENT: &str = "collection";

/// Path segment under which aliases are exported.
pub const ALIAS_SEGMENT: &str = "aliases";

/// Path segment under which sessions are exported.
pub const SESSION_SEGMENT: &str = "session";

/// Interface names, used when emitting signals.
pub const SERVICE_INTERFACE: &str = "org.freedesktop.Secret.Service";
pub const COLLECTION_INTERFACE: &str = "org.freedesktop.Secret.Collection";

/// Property keys as they appear in `a{sv}` property maps and on disk.
pub const COLLECTION_LABEL: &str = "org.freedesktop.Secret.Collection.Label";
pub const ITEM_LABEL: &str = "org.freedesktop.Secret.Item.Label";
pub const ITEM_ATTRIBUTES: &str = "org.freedesktop.Secret.Item.Attributes";

/// Session algorithm names.
pub const ALGORITHM_PLAIN: &str = "plain";
pub const ALGORITHM_DH: &str = "dh-ietf1024-sha256-aes128-cbc-pkcs7";

/// Content type attached to every transported secret.
pub const CONTENT_TYPE: &str = "text/plain";

/// The reserved alias that always exists after startup.
pub const DEFAULT_ALIAS: &str = "default";

/// Label given to a synthesized default collection.
pub const DEFAULT_COLLECTION_LABEL: &str = "default collection";

/// Subdirectory of the password store owned by the daemon.
pub const STORE_PREFIX: &str = "secret_service";

/// Alias table file inside the store prefix.
pub const ALIASES_FILE: &str = ".aliases";

/// Metadata file of a collection, and metadata suffix of an item.
pub const PROPERTIES_FILE: &str = ".properties";

/// Suffix of encrypted password files.
pub const PASSWORD_SUFFIX: &str = ".gpg";

/// pass recipient list file.
pub const GPG_ID_FILE: &str = ".gpg-id";

/// Password store root override, as honored by `pass`.
pub const STORE_DIR_ENV: &str = "PASSWORD_STORE_DIR";

/// Default password store directory relative to HOME.
pub const DEFAULT_STORE_DIR: &str = ".password-store";

/// Config directory name under the XDG config home.
pub const CONFIG_DIR: &str = "pass-secret-service";

/// Config file name.
pub const CONFIG_FILE: &str = "config.toml";

/// Environment variable holding the tracing filter.
pub const LOG_ENV: &str = "PASS_SECRET_SERVICE_LOG";

/// How many fresh identifiers are tried before giving up on a collision.
pub const MAX_ID_ATTEMPTS: usize = 16;
