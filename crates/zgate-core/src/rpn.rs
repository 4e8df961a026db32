//! Type-1 (RPN) query model.
//!
//! The wire codec decodes a client's Type-1 query into this tree; the
//! compilers in `zgate-query` traverse it to emit CQL, Solr or PQF text.

/// OID of the BIB-1 attribute set, the only set the gateway interprets.
pub const BIB1_OID: &str = "1.2.840.10003.3.1";

/// BIB-1 attribute types.
pub mod attr_type {
    pub const USE: u32 = 1;
    pub const RELATION: u32 = 2;
    pub const POSITION: u32 = 3;
    pub const STRUCTURE: u32 = 4;
    pub const TRUNCATION: u32 = 5;
    pub const COMPLETENESS: u32 = 6;
}

/// One attribute from a term's attribute list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute-set OID; `None` means BIB-1 is implied.
    pub set: Option<String>,
    pub kind: u32,
    pub value: u64,
}

impl Attribute {
    pub fn new(kind: u32, value: u64) -> Self {
        Self {
            set: None,
            kind,
            value,
        }
    }

    pub fn with_set(set: impl Into<String>, kind: u32, value: u64) -> Self {
        Self {
            set: Some(set.into()),
            kind,
            value,
        }
    }

    pub fn is_bib1(&self) -> bool {
        self.set.as_deref().map_or(true, |s| s == BIB1_OID)
    }
}

/// A search term with its attribute list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub value: String,
    pub attrs: Vec<Attribute>,
}

impl Term {
    pub fn new(value: impl Into<String>, attrs: Vec<Attribute>) -> Self {
        Self {
            value: value.into(),
            attrs,
        }
    }

    /// First attribute of the given type, if present.
    pub fn attr(&self, kind: u32) -> Option<&Attribute> {
        self.attrs.iter().find(|a| a.kind == kind)
    }
}

/// A Type-1 query tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpnNode {
    Term(Term),
    /// Reference to a named result set held by the session.
    Rsid(String),
    And(Box<RpnNode>, Box<RpnNode>),
    Or(Box<RpnNode>, Box<RpnNode>),
    AndNot(Box<RpnNode>, Box<RpnNode>),
}

impl RpnNode {
    pub fn and(left: RpnNode, right: RpnNode) -> Self {
        RpnNode::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: RpnNode, right: RpnNode) -> Self {
        RpnNode::Or(Box::new(left), Box::new(right))
    }

    pub fn and_not(left: RpnNode, right: RpnNode) -> Self {
        RpnNode::AndNot(Box::new(left), Box::new(right))
    }
}
