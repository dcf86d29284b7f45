//! Vocabulary IRIs used by the rule engine and its bundled rulesets

use crate::model::Node;

pub mod rdf {
    pub const NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
    pub const TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
    pub const PROPERTY: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#Property";
    pub const FIRST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#first";
    pub const REST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#rest";
    pub const NIL: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#nil";
}

pub mod rdfs {
    pub const NS: &str = "http://www.w3.org/2000/01/rdf-schema#";
    pub const SUBCLASS_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subClassOf";
    pub const SUBPROPERTY_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subPropertyOf";
    pub const DOMAIN: &str = "http://www.w3.org/2000/01/rdf-schema#domain";
    pub const RANGE: &str = "http://www.w3.org/2000/01/rdf-schema#range";
    pub const CLASS: &str = "http://www.w3.org/2000/01/rdf-schema#Class";
    pub const RESOURCE: &str = "http://www.w3.org/2000/01/rdf-schema#Resource";
}

pub mod owl {
    pub const NS: &str = "http://www.w3.org/2002/07/owl#";
    pub const THING: &str = "http://www.w3.org/2002/07/owl#Thing";
    pub const ON_PROPERTY: &str = "http://www.w3.org/2002/07/owl#onProperty";
    pub const ALL_VALUES_FROM: &str = "http://www.w3.org/2002/07/owl#allValuesFrom";
}

pub mod xsd {
    pub const NS: &str = "http://www.w3.org/2001/XMLSchema#";
    pub const STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
    pub const BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
    pub const INT: &str = "http://www.w3.org/2001/XMLSchema#int";
    pub const INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
    pub const LONG: &str = "http://www.w3.org/2001/XMLSchema#long";
    pub const FLOAT: &str = "http://www.w3.org/2001/XMLSchema#float";
    pub const DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
    pub const DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";
    pub const DATE_TIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";

    const INTEGER_TYPES: &[&str] = &[
        "int", "integer", "long", "short", "byte",
        "nonNegativeInteger", "nonPositiveInteger", "positiveInteger", "negativeInteger",
        "unsignedLong", "unsignedInt", "unsignedShort", "unsignedByte",
    ];

    pub fn is_integer_type(datatype: &str) -> bool {
        datatype
            .strip_prefix(NS)
            .map_or(false, |local| INTEGER_TYPES.contains(&local))
    }

    pub fn is_decimal_type(datatype: &str) -> bool {
        datatype == FLOAT || datatype == DOUBLE || datatype == DECIMAL
    }
}

/// Engine-internal vocabulary
pub mod rb {
    pub const NS: &str = "urn:x-strix:rule#";
    pub const RESTRICTION: &str = "urn:x-strix:rule#restriction";
    pub const TEMP: &str = "urn:x-strix:rule#temp";
}

/// Namespace used by examples and tests
pub const EG_NS: &str = "urn:x-strix:eg/";

pub fn rdf_type() -> Node { Node::uri(rdf::TYPE) }
pub fn rdfs_subclass_of() -> Node { Node::uri(rdfs::SUBCLASS_OF) }
pub fn rdfs_subproperty_of() -> Node { Node::uri(rdfs::SUBPROPERTY_OF) }
pub fn rdfs_domain() -> Node { Node::uri(rdfs::DOMAIN) }
pub fn rdfs_range() -> Node { Node::uri(rdfs::RANGE) }
pub fn rdfs_class() -> Node { Node::uri(rdfs::CLASS) }
pub fn rdf_nil() -> Node { Node::uri(rdf::NIL) }
