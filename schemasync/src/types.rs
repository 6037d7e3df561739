use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A schema record exactly as the CMS exports it.
pub type Record = Map<String, Value>;

/// Name of the synthesized identity property attached to keyed records.
pub const PK: &str = "pk";

/// The schema collections a snapshot tracks.
///
/// Variant order is the order collections are processed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaCollection {
    Collections,
    Roles,
    Permissions,
    Fields,
    Relations,
}

impl SchemaCollection {
    pub const ALL: [SchemaCollection; 5] = [
        SchemaCollection::Collections,
        SchemaCollection::Roles,
        SchemaCollection::Permissions,
        SchemaCollection::Fields,
        SchemaCollection::Relations,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SchemaCollection::Collections => "collections",
            SchemaCollection::Roles => "roles",
            SchemaCollection::Permissions => "permissions",
            SchemaCollection::Fields => "fields",
            SchemaCollection::Relations => "relations",
        }
    }

    /// Singular noun used in progress messages.
    pub fn item_label(self) -> &'static str {
        match self {
            SchemaCollection::Collections => "collection",
            SchemaCollection::Roles => "role",
            SchemaCollection::Permissions => "permission",
            SchemaCollection::Fields => "field",
            SchemaCollection::Relations => "relation",
        }
    }
}

impl std::fmt::Display for SchemaCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SchemaCollection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SchemaCollection::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown schema collection '{s}'"))
    }
}

/// A complete export of the schema collections at one point in time.
///
/// All five keys are required when deserializing; unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub collections: Vec<Record>,
    pub roles: Vec<Record>,
    pub permissions: Vec<Record>,
    pub fields: Vec<Record>,
    pub relations: Vec<Record>,
}

impl Snapshot {
    pub fn records(&self, collection: SchemaCollection) -> &[Record] {
        match collection {
            SchemaCollection::Collections => &self.collections,
            SchemaCollection::Roles => &self.roles,
            SchemaCollection::Permissions => &self.permissions,
            SchemaCollection::Fields => &self.fields,
            SchemaCollection::Relations => &self.relations,
        }
    }

    pub fn records_mut(&mut self, collection: SchemaCollection) -> &mut Vec<Record> {
        match collection {
            SchemaCollection::Collections => &mut self.collections,
            SchemaCollection::Roles => &mut self.roles,
            SchemaCollection::Permissions => &mut self.permissions,
            SchemaCollection::Fields => &mut self.fields,
            SchemaCollection::Relations => &mut self.relations,
        }
    }

    /// Iterate collections in processing order with their records.
    pub fn iter(&self) -> impl Iterator<Item = (SchemaCollection, &[Record])> {
        SchemaCollection::ALL.into_iter().map(move |c| (c, self.records(c)))
    }

    pub fn total_records(&self) -> usize {
        self.iter().map(|(_, records)| records.len()).sum()
    }
}

/// Read a string property from a record.
pub fn str_prop<'a>(record: &'a Record, property: &str) -> Option<&'a str> {
    record.get(property).and_then(Value::as_str)
}
