//! Entity models shared by the storage backends and the HTTP layer.

use chrono::{DateTime, Utc};
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, Output, ToSql};
use diesel::sql_types::Text;
use diesel::Queryable;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum ProcessCategory {
    Strategic,
    Operational,
    Support,
}

impl ProcessCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strategic => "strategic",
            Self::Operational => "operational",
            Self::Support => "support",
        }
    }
}

impl fmt::Display for ProcessCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strategic" => Ok(Self::Strategic),
            "operational" => Ok(Self::Operational),
            "support" => Ok(Self::Support),
            other => Err(format!("unknown process category: {other}")),
        }
    }
}

impl ToSql<Text, Pg> for ProcessCategory {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        <str as ToSql<Text, Pg>>::to_sql(self.as_str(), out)
    }
}

impl FromSql<Text, Pg> for ProcessCategory {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        let value = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
        value.parse().map_err(Into::into)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Manual,
    Sop,
    Template,
    Other,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Sop => "sop",
            Self::Template => "template",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Self::Manual),
            "sop" => Ok(Self::Sop),
            "template" => Ok(Self::Template),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown document type: {other}")),
        }
    }
}

impl ToSql<Text, Pg> for DocumentType {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        <str as ToSql<Text, Pg>>::to_sql(self.as_str(), out)
    }
}

impl FromSql<Text, Pg> for DocumentType {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        let value = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
        value.parse().map_err(Into::into)
    }
}

/// `password` carries the Argon2id PHC string and is never serialized into
/// responses.
#[derive(Debug, Clone, Serialize, Queryable)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i32,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub full_name: String,
    pub is_admin: bool,
    pub kpi_iframe_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub is_admin: bool,
    pub kpi_iframe_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Queryable)]
#[serde(rename_all = "camelCase")]
pub struct Process {
    pub id: i32,
    pub name: String,
    pub category: ProcessCategory,
    pub icon: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProcess {
    pub name: String,
    pub category: ProcessCategory,
    pub icon: String,
}

#[derive(Debug, Clone, Serialize, Queryable)]
#[serde(rename_all = "camelCase")]
pub struct Subprocess {
    pub id: i32,
    pub name: String,
    pub process_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSubprocess {
    pub name: String,
    pub process_id: i32,
}

#[derive(Debug, Clone, Serialize, Queryable)]
#[serde(rename_all = "camelCase")]
pub struct OtherDocType {
    pub id: i32,
    pub name: String,
    pub icon: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOtherDocType {
    pub name: String,
    pub icon: String,
}

#[derive(Debug, Clone, Serialize, Queryable)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: i32,
    pub name: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub subprocess_id: Option<i32>,
    pub other_doc_type_id: Option<i32>,
    pub version: String,
    pub description: Option<String>,
    pub content: String,
    pub approval_date: DateTime<Utc>,
    pub approvers: String,
    pub keywords: Vec<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDocument {
    pub name: String,
    pub doc_type: DocumentType,
    pub subprocess_id: Option<i32>,
    pub other_doc_type_id: Option<i32>,
    pub version: String,
    pub description: Option<String>,
    pub content: String,
    pub approval_date: DateTime<Utc>,
    pub approvers: String,
    pub keywords: Vec<String>,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Queryable)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i32,
    pub document_id: i32,
    pub user_id: i32,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub document_id: i32,
    pub user_id: i32,
    pub text: String,
}
