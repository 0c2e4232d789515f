//! Mapping between [`ReplicaConfig`] and the replica set configuration document.

use std::collections::HashMap;

use mongodb::bson::{doc, Bson, Document};
use thiserror::Error;

use replset_core::{Address, Member, MemberId, ReplicaConfig};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocumentError {
    #[error("field {0} is missing")]
    Missing(&'static str),
    #[error("field {field} has unexpected value {value}")]
    Unexpected { field: &'static str, value: String },
}

pub fn config_to_document(config: &ReplicaConfig) -> Document {
    let members: Vec<Bson> = config
        .members
        .iter()
        .map(|member| {
            Bson::Document(doc! {
                "_id": integer(member.id as u64),
                "host": member.address.to_string(),
            })
        })
        .collect();
    doc! {
        "_id": config.name.as_str(),
        "version": integer(config.version),
        "members": members,
    }
}

/// Applies `config` onto a configuration document previously returned by the server.
///
/// Only the member list and the version are rewritten. Surviving members keep their options
/// (priority, votes, tags, ...) and every other top-level field such as `settings` is kept.
/// `term` is owned by the server and dropped.
pub fn merge_into_document(base: &Document, config: &ReplicaConfig, default_port: u16) -> Document {
    let previous: HashMap<String, &Document> = base
        .get_array("members")
        .map(|members| {
            members
                .iter()
                .filter_map(|member| match member {
                    Bson::Document(member) => Some(member),
                    _ => None,
                })
                .filter_map(|member| {
                    let host = member.get_str("host").ok()?;
                    let address = Address::parse_with_default_port(host, default_port).ok()?;
                    Some((address.host().to_string(), member))
                })
                .collect()
        })
        .unwrap_or_default();
    let members: Vec<Bson> = config
        .members
        .iter()
        .map(|member| {
            let mut document = previous
                .get(member.address.host())
                .map(|previous| (*previous).clone())
                .unwrap_or_default();
            document.insert("_id", integer(member.id as u64));
            document.insert("host", member.address.to_string());
            Bson::Document(document)
        })
        .collect();
    let mut document = base.clone();
    document.remove("term");
    document.insert("_id", config.name.as_str());
    document.insert("version", integer(config.version));
    document.insert("members", members);
    document
}

/// Parses the document found under `config` in a `replSetGetConfig` reply.
pub fn document_to_config(document: &Document, default_port: u16) -> Result<ReplicaConfig, DocumentError> {
    let name = match document.get("_id") {
        Some(Bson::String(name)) => name.clone(),
        Some(other) => return Err(unexpected("_id", other)),
        None => return Err(DocumentError::Missing("_id")),
    };
    let version = document.get("version").ok_or(DocumentError::Missing("version"))?;
    let version = as_u64(version).ok_or_else(|| unexpected("version", version))?;
    let members = match document.get("members") {
        Some(Bson::Array(members)) => members,
        Some(other) => return Err(unexpected("members", other)),
        None => return Err(DocumentError::Missing("members")),
    };
    let members = members
        .iter()
        .map(|member| member_from_bson(member, default_port))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ReplicaConfig { name, members, version })
}

fn member_from_bson(member: &Bson, default_port: u16) -> Result<Member, DocumentError> {
    let Bson::Document(member) = member else {
        return Err(unexpected("members", member));
    };
    let id = member.get("_id").ok_or(DocumentError::Missing("members._id"))?;
    let id = as_u64(id)
        .and_then(|id| MemberId::try_from(id).ok())
        .ok_or_else(|| unexpected("members._id", id))?;
    let address = match member.get("host") {
        Some(Bson::String(host)) => Address::parse_with_default_port(host, default_port)
            .map_err(|_| DocumentError::Unexpected { field: "members.host", value: host.clone() })?,
        Some(other) => return Err(unexpected("members.host", other)),
        None => return Err(DocumentError::Missing("members.host")),
    };
    Ok(Member::new(id, address))
}

fn integer(value: u64) -> Bson {
    match i32::try_from(value) {
        Ok(value) => Bson::Int32(value),
        Err(_) => Bson::Int64(value as i64),
    }
}

fn as_u64(value: &Bson) -> Option<u64> {
    match value {
        Bson::Int32(v) => u64::try_from(*v).ok(),
        Bson::Int64(v) => u64::try_from(*v).ok(),
        Bson::Double(v) if v.fract() == 0.0 && *v >= 0.0 => Some(*v as u64),
        _ => None,
    }
}

fn unexpected(field: &'static str, value: &Bson) -> DocumentError {
    DocumentError::Unexpected { field, value: value.to_string() }
}
