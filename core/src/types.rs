//! Guest-level types as they appear in method types and field signatures.

use std::fmt;

use crate::class::{ClassRef, well_known};

/// A guest type: `void`, one of the eight primitives, or a class/array reference.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum JType {
    Void,
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Ref(ClassRef),
}

impl JType {
    pub const PRIMITIVES: [JType; 8] = [
        JType::Boolean,
        JType::Byte,
        JType::Char,
        JType::Short,
        JType::Int,
        JType::Long,
        JType::Float,
        JType::Double,
    ];

    #[inline]
    pub fn of(class: &ClassRef) -> JType {
        JType::Ref(class.clone())
    }

    pub fn object() -> JType {
        JType::Ref(well_known().object.clone())
    }

    pub fn string() -> JType {
        JType::Ref(well_known().string.clone())
    }

    /// Array type whose component is `component`.
    pub fn array_of(component: &JType) -> JType {
        JType::Ref(ClassRef::array_of(component))
    }

    #[inline]
    pub fn is_void(&self) -> bool {
        matches!(self, JType::Void)
    }

    #[inline]
    pub fn is_primitive(&self) -> bool {
        !matches!(self, JType::Void | JType::Ref(_))
    }

    #[inline]
    pub fn is_reference(&self) -> bool {
        matches!(self, JType::Ref(_))
    }

    /// boolean, byte, char and short all travel as `int` at the calling-convention level.
    #[inline]
    pub fn is_sub_int(&self) -> bool {
        matches!(self, JType::Boolean | JType::Byte | JType::Char | JType::Short)
    }

    #[inline]
    pub fn class(&self) -> Option<&ClassRef> {
        match self {
            JType::Ref(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_array(&self) -> bool {
        self.class().is_some_and(|c| c.is_array())
    }

    pub fn component_type(&self) -> Option<JType> {
        self.class().and_then(|c| c.component_type().cloned())
    }

    /// Argument slots used by one value of this type.
    #[inline]
    pub fn slot_count(&self) -> usize {
        match self {
            JType::Void => 0,
            JType::Long | JType::Double => 2,
            _ => 1,
        }
    }

    pub fn descriptor(&self) -> String {
        match self {
            JType::Void => "V".into(),
            JType::Boolean => "Z".into(),
            JType::Byte => "B".into(),
            JType::Char => "C".into(),
            JType::Short => "S".into(),
            JType::Int => "I".into(),
            JType::Long => "J".into(),
            JType::Float => "F".into(),
            JType::Double => "D".into(),
            JType::Ref(c) => c.descriptor(),
        }
    }

    /// `self := other` without conversion.
    pub fn is_assignable_from(&self, other: &JType) -> bool {
        match (self, other) {
            (JType::Ref(to), JType::Ref(from)) => to.is_assignable_from(from),
            _ => self == other,
        }
    }

    /// Primitive widening conversion (JLS 5.1.2); identity is not a widening.
    pub fn widens_to(&self, to: &JType) -> bool {
        use JType::*;
        matches!(
            (self, to),
            (Byte, Short | Int | Long | Float | Double)
                | (Short, Int | Long | Float | Double)
                | (Char, Int | Long | Float | Double)
                | (Int, Long | Float | Double)
                | (Long, Float | Double)
                | (Float, Double)
        )
    }

    pub fn wrapper_class(&self) -> Option<ClassRef> {
        let wk = well_known();
        let class = match self {
            JType::Boolean => &wk.boolean,
            JType::Byte => &wk.byte,
            JType::Char => &wk.character,
            JType::Short => &wk.short,
            JType::Int => &wk.integer,
            JType::Long => &wk.long,
            JType::Float => &wk.float,
            JType::Double => &wk.double,
            _ => return None,
        };
        Some(class.clone())
    }

    /// The primitive a wrapper class boxes, if `self` is a wrapper reference.
    pub fn unwrapped(&self) -> Option<JType> {
        let class = self.class()?;
        JType::PRIMITIVES
            .into_iter()
            .find(|p| p.wrapper_class().is_some_and(|w| &w == class))
    }

    /// Wrapper reference for primitives, `self` otherwise.
    pub fn wrapped(&self) -> JType {
        match self.wrapper_class() {
            Some(w) => JType::Ref(w),
            None => self.clone(),
        }
    }

    pub fn simple_name(&self) -> String {
        match self {
            JType::Void => "void".into(),
            JType::Boolean => "boolean".into(),
            JType::Byte => "byte".into(),
            JType::Char => "char".into(),
            JType::Short => "short".into(),
            JType::Int => "int".into(),
            JType::Long => "long".into(),
            JType::Float => "float".into(),
            JType::Double => "double".into(),
            JType::Ref(c) => c.simple_name(),
        }
    }
}

impl fmt::Debug for JType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.simple_name())
    }
}

impl fmt::Display for JType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.simple_name())
    }
}
