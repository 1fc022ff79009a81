//! Type descriptors.
//!
//! This is a private module. Its public items are re-exported by the crate
//! root.
//!
//! A [`TypeDescr`] tells the codecs what shape of data to expect at a
//! structural node: a primitive of some kind, a class with named members,
//! a choice between named variants, or a container of uniform elements.
//! Descriptors are plain data. How they are produced, whether hand-written
//! or generated from a schema, is none of this crate's business. The codecs
//! only ever query them.

use std::fmt;
use crate::tag::Tag;


//------------ Tagging -------------------------------------------------------

/// The tagging discipline of a class or choice.
///
/// This governs how a member or variant tag relates to the natural tag of
/// the value it labels in the binary format.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Tagging {
    /// The member tag is written as a wrapper around the natural tag.
    Explicit,

    /// The member tag replaces the natural tag.
    Implicit,

    /// Like implicit, but assigned per module.
    ///
    /// With automatic tagging, member tag numbers are simply the member
    /// positions unless assigned otherwise.
    #[default]
    Automatic,
}


//------------ EnumDescr -----------------------------------------------------

/// The named values of an enumerated type.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EnumDescr {
    /// The named values in declaration order.
    values: Vec<(String, i64)>,

    /// Whether values outside the named set are permitted.
    open: bool,
}

impl EnumDescr {
    /// Creates a new enumerated descriptor from name-value pairs.
    pub fn new<'a>(
        values: impl IntoIterator<Item = (&'a str, i64)>, open: bool
    ) -> Self {
        Self {
            values: values.into_iter().map(|(name, value)| {
                (name.into(), value)
            }).collect(),
            open
        }
    }

    /// Returns whether arbitrary integer values are permitted.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Returns the value for a name.
    pub fn by_name(&self, name: &str) -> Option<i64> {
        self.values.iter().find_map(|(n, value)| {
            (n == name).then_some(*value)
        })
    }

    /// Returns the name for a value.
    pub fn by_value(&self, value: i64) -> Option<&str> {
        self.values.iter().find_map(|(name, v)| {
            (*v == value).then_some(name.as_str())
        })
    }

    /// Returns an iterator over the names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(name, _)| name.as_str())
    }
}


//------------ PrimitiveKind -------------------------------------------------

/// The kind of a primitive type.
#[derive(Clone, Debug, PartialEq)]
pub enum PrimitiveKind {
    Null,
    Bool,
    Integer,
    Unsigned,
    Real,
    VisibleString,
    Utf8String,

    /// A visible string carried under the StringStore application tag.
    StringStore,
    OctetString,
    BitString,
    Enum(EnumDescr),
}

impl PrimitiveKind {
    /// Returns the natural tag values of this kind carry.
    pub fn natural_tag(&self) -> Tag {
        match *self {
            PrimitiveKind::Null => Tag::NULL,
            PrimitiveKind::Bool => Tag::BOOLEAN,
            PrimitiveKind::Integer => Tag::INTEGER,
            PrimitiveKind::Unsigned => Tag::INTEGER,
            PrimitiveKind::Real => Tag::REAL,
            PrimitiveKind::VisibleString => Tag::VISIBLE_STRING,
            PrimitiveKind::Utf8String => Tag::UTF8_STRING,
            PrimitiveKind::StringStore => Tag::STRING_STORE,
            PrimitiveKind::OctetString => Tag::OCTET_STRING,
            PrimitiveKind::BitString => Tag::BIT_STRING,
            PrimitiveKind::Enum(_) => Tag::ENUMERATED,
        }
    }
}


//------------ MemberDescr ---------------------------------------------------

/// One member of a class.
#[derive(Clone, Debug, PartialEq)]
pub struct MemberDescr {
    /// The label of the member in text notation.
    pub name: String,

    /// The context tag number of the member in binary notation.
    pub tag: u32,

    /// Whether the member may be absent.
    pub optional: bool,

    /// A tagging discipline overriding that of the class.
    pub tagging: Option<Tagging>,

    /// The type of the member value.
    pub descr: TypeDescr,
}


//------------ ClassDescr ----------------------------------------------------

/// A class: a structure with an ordered list of named members.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassDescr {
    /// The type name.
    name: String,

    /// The members in declaration order.
    members: Vec<MemberDescr>,

    /// The tagging discipline of the class.
    tagging: Tagging,

    /// Whether the binary encoding uses the SET rather than SEQUENCE tag.
    set: bool,
}

impl ClassDescr {
    /// Creates a new class descriptor with no members yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            tagging: Tagging::default(),
            set: false,
        }
    }

    /// Sets the tagging discipline.
    pub fn tagging(mut self, tagging: Tagging) -> Self {
        self.tagging = tagging;
        self
    }

    /// Marks the class as encoding with the SET tag.
    pub fn set(mut self) -> Self {
        self.set = true;
        self
    }

    /// Appends a mandatory member.
    ///
    /// The member's tag number is its position in the member list.
    pub fn member(self, name: impl Into<String>, descr: TypeDescr) -> Self {
        self.push_member(name, descr, false, None)
    }

    /// Appends an optional member.
    pub fn optional_member(
        self, name: impl Into<String>, descr: TypeDescr
    ) -> Self {
        self.push_member(name, descr, true, None)
    }

    /// Appends a member with an explicit tagging override.
    pub fn member_with_tagging(
        self, name: impl Into<String>, descr: TypeDescr, tagging: Tagging
    ) -> Self {
        self.push_member(name, descr, false, Some(tagging))
    }

    fn push_member(
        mut self,
        name: impl Into<String>,
        descr: TypeDescr,
        optional: bool,
        tagging: Option<Tagging>,
    ) -> Self {
        let tag = self.members.len() as u32;
        self.members.push(MemberDescr {
            name: name.into(), tag, optional, tagging, descr
        });
        self
    }

    /// Returns the type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the tagging discipline of the class.
    pub fn class_tagging(&self) -> Tagging {
        self.tagging
    }

    /// Returns the effective tagging discipline for a member.
    pub fn member_tagging(&self, index: usize) -> Tagging {
        self.members[index].tagging.unwrap_or(self.tagging)
    }

    /// Returns the members in order.
    pub fn members(&self) -> &[MemberDescr] {
        &self.members
    }

    /// Returns the member at the given index.
    pub fn get(&self, index: usize) -> &MemberDescr {
        &self.members[index]
    }

    /// Returns the index of the member with the given label.
    pub fn index_by_name(&self, name: &str) -> Option<usize> {
        self.members.iter().position(|member| member.name == name)
    }

    /// Returns the index of the member with the given tag number.
    pub fn index_by_tag(&self, tag: u32) -> Option<usize> {
        self.members.iter().position(|member| member.tag == tag)
    }

    /// Returns the natural tag of a value of this class.
    pub fn natural_tag(&self) -> Tag {
        if self.set { Tag::SET } else { Tag::SEQUENCE }
    }

    /// Formats the member labels for an error message.
    pub fn member_names(&self) -> MemberNames {
        MemberNames(&self.members)
    }
}

/// A helper displaying the list of member labels of a class.
pub struct MemberNames<'a>(&'a [MemberDescr]);

impl fmt::Display for MemberNames<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (idx, member) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            f.write_str(&member.name)?;
        }
        Ok(())
    }
}


//------------ VariantDescr --------------------------------------------------

/// One variant of a choice.
#[derive(Clone, Debug, PartialEq)]
pub struct VariantDescr {
    /// The label of the variant in text notation.
    pub name: String,

    /// The context tag number of the variant in binary notation.
    pub tag: u32,

    /// The type of the variant value.
    pub descr: TypeDescr,
}


//------------ ChoiceDescr ---------------------------------------------------

/// A choice between several named alternatives.
#[derive(Clone, Debug, PartialEq)]
pub struct ChoiceDescr {
    /// The type name.
    name: String,

    /// The variants in declaration order.
    variants: Vec<VariantDescr>,

    /// The tagging discipline of the choice.
    tagging: Tagging,
}

impl ChoiceDescr {
    /// Creates a new choice descriptor with no variants yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variants: Vec::new(),
            tagging: Tagging::default(),
        }
    }

    /// Sets the tagging discipline.
    pub fn tagging(mut self, tagging: Tagging) -> Self {
        self.tagging = tagging;
        self
    }

    /// Appends a variant.
    ///
    /// The variant's tag number is its position in the variant list.
    pub fn variant(
        mut self, name: impl Into<String>, descr: TypeDescr
    ) -> Self {
        let tag = self.variants.len() as u32;
        self.variants.push(VariantDescr { name: name.into(), tag, descr });
        self
    }

    /// Returns the type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the tagging discipline of the choice.
    pub fn choice_tagging(&self) -> Tagging {
        self.tagging
    }

    /// Returns the variants in order.
    pub fn variants(&self) -> &[VariantDescr] {
        &self.variants
    }

    /// Returns the variant at the given index.
    pub fn get(&self, index: usize) -> &VariantDescr {
        &self.variants[index]
    }

    /// Returns the index of the variant with the given label.
    pub fn index_by_name(&self, name: &str) -> Option<usize> {
        self.variants.iter().position(|variant| variant.name == name)
    }

    /// Returns the index of the variant with the given tag number.
    pub fn index_by_tag(&self, tag: u32) -> Option<usize> {
        self.variants.iter().position(|variant| variant.tag == tag)
    }

    /// Formats the variant labels for an error message.
    pub fn variant_names(&self) -> VariantNames {
        VariantNames(&self.variants)
    }
}

/// A helper displaying the list of variant labels of a choice.
pub struct VariantNames<'a>(&'a [VariantDescr]);

impl fmt::Display for VariantNames<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (idx, variant) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            f.write_str(&variant.name)?;
        }
        Ok(())
    }
}


//------------ ContainerDescr ------------------------------------------------

/// A container of uniform elements: SEQUENCE OF or SET OF.
#[derive(Clone, Debug, PartialEq)]
pub struct ContainerDescr {
    /// The type of the elements.
    element: TypeDescr,

    /// Whether the binary encoding uses the SET rather than SEQUENCE tag.
    set: bool,
}

impl ContainerDescr {
    /// Creates a new SEQUENCE OF descriptor.
    pub fn sequence_of(element: TypeDescr) -> Self {
        Self { element, set: false }
    }

    /// Creates a new SET OF descriptor.
    pub fn set_of(element: TypeDescr) -> Self {
        Self { element, set: true }
    }

    /// Returns the element type.
    pub fn element(&self) -> &TypeDescr {
        &self.element
    }

    /// Returns the natural tag of a value of this container.
    pub fn natural_tag(&self) -> Tag {
        if self.set { Tag::SET } else { Tag::SEQUENCE }
    }
}


//------------ TypeDescr -----------------------------------------------------

/// The description of a type.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeDescr {
    /// A primitive value.
    Primitive(PrimitiveKind),

    /// A structure with named members.
    Class(ClassDescr),

    /// A choice between named alternatives.
    Choice(ChoiceDescr),

    /// A container of uniform elements.
    Container(Box<ContainerDescr>),
}

/// # Shorthands for building descriptors.
impl TypeDescr {
    pub fn null() -> Self {
        TypeDescr::Primitive(PrimitiveKind::Null)
    }

    pub fn boolean() -> Self {
        TypeDescr::Primitive(PrimitiveKind::Bool)
    }

    pub fn integer() -> Self {
        TypeDescr::Primitive(PrimitiveKind::Integer)
    }

    pub fn unsigned() -> Self {
        TypeDescr::Primitive(PrimitiveKind::Unsigned)
    }

    pub fn real() -> Self {
        TypeDescr::Primitive(PrimitiveKind::Real)
    }

    pub fn visible_string() -> Self {
        TypeDescr::Primitive(PrimitiveKind::VisibleString)
    }

    pub fn utf8_string() -> Self {
        TypeDescr::Primitive(PrimitiveKind::Utf8String)
    }

    pub fn string_store() -> Self {
        TypeDescr::Primitive(PrimitiveKind::StringStore)
    }

    pub fn octet_string() -> Self {
        TypeDescr::Primitive(PrimitiveKind::OctetString)
    }

    pub fn bit_string() -> Self {
        TypeDescr::Primitive(PrimitiveKind::BitString)
    }

    pub fn enumerated(descr: EnumDescr) -> Self {
        TypeDescr::Primitive(PrimitiveKind::Enum(descr))
    }

    pub fn sequence_of(element: TypeDescr) -> Self {
        TypeDescr::Container(Box::new(ContainerDescr::sequence_of(element)))
    }

    pub fn set_of(element: TypeDescr) -> Self {
        TypeDescr::Container(Box::new(ContainerDescr::set_of(element)))
    }
}

impl TypeDescr {
    /// Returns the natural tag of a value of this type.
    ///
    /// A choice has no tag of its own; the chosen variant's tag stands in
    /// for it, so this returns `None` for choices.
    pub fn natural_tag(&self) -> Option<Tag> {
        match self {
            TypeDescr::Primitive(kind) => Some(kind.natural_tag()),
            TypeDescr::Class(descr) => Some(descr.natural_tag()),
            TypeDescr::Choice(_) => None,
            TypeDescr::Container(descr) => Some(descr.natural_tag()),
        }
    }

    /// Returns the type name if the type has one.
    pub fn name(&self) -> Option<&str> {
        match self {
            TypeDescr::Class(descr) => Some(descr.name()),
            TypeDescr::Choice(descr) => Some(descr.name()),
            _ => None
        }
    }
}

impl From<ClassDescr> for TypeDescr {
    fn from(src: ClassDescr) -> Self {
        TypeDescr::Class(src)
    }
}

impl From<ChoiceDescr> for TypeDescr {
    fn from(src: ChoiceDescr) -> Self {
        TypeDescr::Choice(src)
    }
}


//============ Tests =========================================================
