//! Tenant schema naming and SQL identifier validation.
//!
//! Every schema, table, or column name that reaches dynamically built SQL
//! text must pass through [`SchemaName::for_tenant`], [`Identifier::parse`],
//! or [`qualify`]. Data values are always bound as parameters.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

/// Prefix shared by every tenant schema.
pub const TENANT_SCHEMA_PREFIX: &str = "tenant_";

/// Allow-list for identifiers embedded into SQL text.
static SAFE_IDENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z_][a-z0-9_]{0,62}$").expect("identifier pattern is valid")
});

/// Returns true if `value` may be embedded into SQL text as an identifier.
pub fn is_safe_identifier(value: &str) -> bool {
    SAFE_IDENT.is_match(value)
}

/// A validated SQL identifier (table or column name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(String);

impl Identifier {
    /// Validates `value` against the identifier allow-list.
    pub fn parse(value: &str) -> Result<Self> {
        if is_safe_identifier(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(Error::invalid_identifier(format!(
                "'{}' is not a safe SQL identifier",
                value
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Double-quoted form for SQL text.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A tenant's PostgreSQL schema name, derived 1:1 from its tenant id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaName(Identifier);

impl SchemaName {
    /// Derives the schema for a tenant id.
    ///
    /// Normalization trims surrounding whitespace, lowercases, maps `-` to
    /// `_`, and prepends [`TENANT_SCHEMA_PREFIX`]. Anything else outside
    /// `[a-z0-9_]` is rejected rather than rewritten, so two different
    /// tenant ids can never collapse onto the same schema through lossy
    /// substitution.
    pub fn for_tenant(tenant_id: &str) -> Result<Self> {
        let normalized = tenant_id.trim().to_lowercase().replace('-', "_");
        if normalized.is_empty() {
            return Err(Error::invalid_identifier("tenant id is empty"));
        }

        let candidate = format!("{}{}", TENANT_SCHEMA_PREFIX, normalized);
        if !is_safe_identifier(&candidate) {
            return Err(Error::invalid_identifier(format!(
                "tenant id '{}' does not map to a valid schema name",
                tenant_id
            )));
        }

        Ok(Self(Identifier(candidate)))
    }

    /// Validates an existing schema name (e.g. one read from the catalog).
    pub fn parse(value: &str) -> Result<Self> {
        Identifier::parse(value).map(Self)
    }

    /// Tenant id recovered from a schema name, for schema-scan discovery.
    pub fn tenant_id(&self) -> Option<&str> {
        self.as_str().strip_prefix(TENANT_SCHEMA_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn quoted(&self) -> String {
        self.0.quoted()
    }
}

impl fmt::Display for SchemaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A schema-qualified table reference, already quoted for SQL text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName(String);

impl QualifiedName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives the schema for a tenant id. See [`SchemaName::for_tenant`].
pub fn schema_for(tenant_id: &str) -> Result<SchemaName> {
    SchemaName::for_tenant(tenant_id)
}

/// Builds `"schema"."table"`, validating both parts.
pub fn qualify(schema: &str, table: &str) -> Result<QualifiedName> {
    let schema = Identifier::parse(schema)?;
    let table = Identifier::parse(table)?;
    Ok(QualifiedName(format!("{}.{}", schema.quoted(), table.quoted())))
}

impl SchemaName {
    /// Qualifies `table` inside this schema.
    pub fn table(&self, table: &str) -> Result<QualifiedName> {
        qualify(self.as_str(), table)
    }
}
