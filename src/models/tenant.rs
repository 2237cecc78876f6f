use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlanType {
    Free,
    Pro,
}

impl PlanType {
    /// Maximum number of notes a tenant on this plan may hold.
    pub fn note_limit(self) -> Option<i64> {
        match self {
            PlanType::Free => Some(3),
            PlanType::Pro => None,
        }
    }
}

impl std::fmt::Display for PlanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PlanType::Free => "FREE",
            PlanType::Pro => "PRO",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for PlanType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FREE" => Ok(PlanType::Free),
            "PRO" => Ok(PlanType::Pro),
            _ => Err(anyhow::anyhow!("Unknown plan: {s}")),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct TenantRow {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub plan: String,
    pub created_at: DateTime<Utc>,
}

/// Owned by the tenant directory; the auth core only reads it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub plan: PlanType,
    pub created_at: DateTime<Utc>,
}

impl From<TenantRow> for Tenant {
    fn from(r: TenantRow) -> Self {
        Self {
            id: r.id,
            slug: r.slug,
            name: r.name,
            plan: r.plan.parse().unwrap_or(PlanType::Free),
            created_at: r.created_at,
        }
    }
}
