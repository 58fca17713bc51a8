use std::fmt;

use serde::Serialize;

/// Closed set of handle kinds. The numeric codes are stable and double as the
/// first component of every thunk key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[repr(u8)]
pub enum HandleKind {
    Bound = 0,
    GetField = 1,
    GetStaticField = 2,
    PutField = 3,
    PutStaticField = 4,
    Virtual = 5,
    Static = 6,
    Special = 7,
    Constructor = 8,
    Interface = 9,
    Collect = 10,
    InvokeExact = 11,
    InvokeGeneric = 12,
    AsType = 13,
    DynamicInvoker = 14,
    FilterReturn = 15,
    ExplicitCast = 16,
    VarargsCollect = 17,
    Spread = 19,
    Insert = 20,
    Permute = 21,
    ConstantObject = 22,
    ConstantInt = 23,
    ConstantFloat = 24,
    ConstantLong = 25,
    ConstantDouble = 26,
    Fold = 27,
    GuardWithTest = 28,
    FilterArguments = 29,
    VarHandleInvokeExact = 30,
    VarHandleInvokeGeneric = 31,
    Catch = 32,
    Finally = 33,
    Loop = 34,
}

impl HandleKind {
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Kinds bound to a resolved VM member.
    pub fn is_primitive(self) -> bool {
        matches!(
            self,
            HandleKind::GetField
                | HandleKind::GetStaticField
                | HandleKind::PutField
                | HandleKind::PutStaticField
                | HandleKind::Virtual
                | HandleKind::Static
                | HandleKind::Special
                | HandleKind::Constructor
                | HandleKind::Interface
        )
    }

    pub fn is_field_access(self) -> bool {
        matches!(
            self,
            HandleKind::GetField | HandleKind::GetStaticField | HandleKind::PutField | HandleKind::PutStaticField
        )
    }

    pub fn is_constant(self) -> bool {
        matches!(
            self,
            HandleKind::ConstantObject
                | HandleKind::ConstantInt
                | HandleKind::ConstantFloat
                | HandleKind::ConstantLong
                | HandleKind::ConstantDouble
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            HandleKind::Bound => "bound",
            HandleKind::GetField => "getField",
            HandleKind::GetStaticField => "getStaticField",
            HandleKind::PutField => "putField",
            HandleKind::PutStaticField => "putStaticField",
            HandleKind::Virtual => "virtual",
            HandleKind::Static => "static",
            HandleKind::Special => "special",
            HandleKind::Constructor => "constructor",
            HandleKind::Interface => "interface",
            HandleKind::Collect => "collect",
            HandleKind::InvokeExact => "invokeExact",
            HandleKind::InvokeGeneric => "invokeGeneric",
            HandleKind::AsType => "asType",
            HandleKind::DynamicInvoker => "dynamicInvoker",
            HandleKind::FilterReturn => "filterReturn",
            HandleKind::ExplicitCast => "explicitCast",
            HandleKind::VarargsCollect => "varargsCollect",
            HandleKind::Spread => "spread",
            HandleKind::Insert => "insert",
            HandleKind::Permute => "permute",
            HandleKind::ConstantObject => "constantObject",
            HandleKind::ConstantInt => "constantInt",
            HandleKind::ConstantFloat => "constantFloat",
            HandleKind::ConstantLong => "constantLong",
            HandleKind::ConstantDouble => "constantDouble",
            HandleKind::Fold => "fold",
            HandleKind::GuardWithTest => "guardWithTest",
            HandleKind::FilterArguments => "filterArguments",
            HandleKind::VarHandleInvokeExact => "varHandleInvokeExact",
            HandleKind::VarHandleInvokeGeneric => "varHandleInvokeGeneric",
            HandleKind::Catch => "catch",
            HandleKind::Finally => "finally",
            HandleKind::Loop => "loop",
        }
    }
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
