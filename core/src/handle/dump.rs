//! Diagnostic rendering of a handle graph.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::thunk;

use super::{HandleKind, MemberInfo, MethodHandle};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleDump {
    pub kind: HandleKind,
    pub kind_code: u8,
    #[serde(rename = "type")]
    pub method_type: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member: Option<MemberInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<HandleDump>,
}

impl MethodHandle {
    /// The graph below this handle. Shared children appear once per use.
    pub fn dump(&self) -> HandleDump {
        HandleDump {
            kind: self.kind(),
            kind_code: self.kind().code(),
            method_type: self.method_type().to_string(),
            params: thunk::structural_params(self),
            member: self.member_info(),
            children: thunk::children(self).into_iter().map(MethodHandle::dump).collect(),
        }
    }

    pub fn dump_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.dump()).context("serializing handle dump")
    }
}
