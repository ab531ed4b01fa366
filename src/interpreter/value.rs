use std::{fmt::Display, rc::Rc};

use crate::{
    ast::{statements::ProcedureDefinitionStmt, types::Type},
    errors::errors::{Error, ErrorImpl},
    Position,
};

/// Shared behaviour of ordered runtime collections.
pub trait Collection {
    fn collection_type(&self) -> &Type;
    fn len(&self) -> usize;
    fn get(&self, index: i64) -> Result<&Value, Error>;
    fn set(&mut self, index: i64, value: Value) -> Result<(), Error>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn checked_index(index: i64, length: usize) -> Result<usize, Error> {
    if index < 0 || index as usize >= length {
        return Err(Error::new(ErrorImpl::IndexOutOfBounds { index, length }, Position::null()));
    }
    Ok(index as usize)
}

/// Fixed-length heterogeneous values. Elements are only ever replaced in
/// place, never added or removed.
#[derive(Debug, Clone, PartialEq)]
pub struct TupleValue {
    pub tuple_type: Type,
    values: Box<[Value]>,
}

impl TupleValue {
    pub fn new(tuple_type: Type, values: Vec<Value>) -> Self {
        TupleValue {
            tuple_type,
            values: values.into_boxed_slice(),
        }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get_mut(&mut self, index: i64) -> Result<&mut Value, Error> {
        let index = checked_index(index, self.values.len())?;
        Ok(&mut self.values[index])
    }
}

impl Collection for TupleValue {
    fn collection_type(&self) -> &Type {
        &self.tuple_type
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn get(&self, index: i64) -> Result<&Value, Error> {
        let index = checked_index(index, self.values.len())?;
        Ok(&self.values[index])
    }

    fn set(&mut self, index: i64, value: Value) -> Result<(), Error> {
        *self.get_mut(index)? = value;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListValue {
    pub list_type: Type,
    pub values: Vec<Value>,
}

impl ListValue {
    pub fn new(list_type: Type, values: Vec<Value>) -> Self {
        ListValue { list_type, values }
    }

    pub fn get_mut(&mut self, index: i64) -> Result<&mut Value, Error> {
        let index = checked_index(index, self.values.len())?;
        Ok(&mut self.values[index])
    }
}

impl Collection for ListValue {
    fn collection_type(&self) -> &Type {
        &self.list_type
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn get(&self, index: i64) -> Result<&Value, Error> {
        let index = checked_index(index, self.values.len())?;
        Ok(&self.values[index])
    }

    fn set(&mut self, index: i64, value: Value) -> Result<(), Error> {
        *self.get_mut(index)? = value;
        Ok(())
    }
}

/// Map values keep insertion order. Keys are compared structurally, which
/// floats do not allow for hashing.
#[derive(Debug, Clone, PartialEq)]
pub struct MapValue {
    pub map_type: Type,
    entries: Vec<(Value, Value)>,
}

impl MapValue {
    pub fn new(map_type: Type) -> Self {
        MapValue {
            map_type,
            entries: vec![],
        }
    }

    pub fn entries(&self) -> &[(Value, Value)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &Value) -> Result<&Value, Error> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
            .ok_or_else(|| Error::new(ErrorImpl::MissingKey { key: key.to_string() }, Position::null()))
    }

    pub fn get_mut(&mut self, key: &Value) -> Result<&mut Value, Error> {
        self.entries
            .iter_mut()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
            .ok_or_else(|| Error::new(ErrorImpl::MissingKey { key: key.to_string() }, Position::null()))
    }

    /// Inserts or replaces the value under `key`.
    pub fn insert(&mut self, key: Value, value: Value) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((key, value)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
    Nothing,
    List(ListValue),
    Map(MapValue),
    Tuple(TupleValue),
    UserDefined { type_name: String, value: Box<Value> },
    Procedure(Rc<ProcedureDefinitionStmt>),
}

impl Value {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&TupleValue> {
        match self {
            Value::Tuple(tuple) => Some(tuple),
            _ => None,
        }
    }
}

fn join_values<'a>(values: impl Iterator<Item = &'a Value>) -> String {
    values.map(Value::to_string).collect::<Vec<_>>().join(", ")
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Integer(value) => write!(f, "{}", value),
            Value::Float(value) => write!(f, "{:?}", value),
            Value::Text(value) => write!(f, "{}", value),
            Value::Boolean(value) => write!(f, "{}", value),
            Value::Nothing => write!(f, "()"),
            Value::List(list) => write!(f, "[{}]", join_values(list.values.iter())),
            Value::Map(map) => {
                // Sorted by rendered entry, so output does not depend on insertion order.
                let mut entries = map
                    .entries()
                    .iter()
                    .map(|(key, value)| format!("{}: {}", key, value))
                    .collect::<Vec<_>>();
                entries.sort();
                write!(f, "{{{}}}", entries.join(", "))
            }
            Value::Tuple(tuple) => write!(f, "({})", join_values(tuple.values().iter())),
            Value::UserDefined { type_name, value } => write!(f, "{}({})", type_name, value),
            Value::Procedure(procedure) => write!(f, "<{}>", procedure.kind.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> TupleValue {
        TupleValue::new(
            Type::tuple(vec![Type::Integer, Type::Text]),
            vec![Value::Integer(1), Value::Text(String::from("a"))],
        )
    }

    #[test]
    fn test_tuple_positional_replacement() {
        let mut tuple = pair();
        tuple.set(1, Value::Text(String::from("b"))).unwrap();

        assert_eq!(tuple.len(), 2);
        assert_eq!(tuple.get(1).unwrap(), &Value::Text(String::from("b")));
        assert_eq!(tuple.collection_type(), &Type::tuple(vec![Type::Integer, Type::Text]));
    }

    #[test]
    fn test_tuple_index_out_of_bounds() {
        let mut tuple = pair();

        assert_eq!(tuple.get(2).unwrap_err().get_error_name(), "IndexOutOfBounds");
        assert!(tuple.set(-1, Value::Nothing).is_err());
    }

    #[test]
    fn test_map_insert_replaces() {
        let mut map = MapValue::new(Type::map(Type::Text, Type::Integer));
        map.insert(Value::Text(String::from("k")), Value::Integer(1));
        map.insert(Value::Text(String::from("k")), Value::Integer(2));

        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&Value::Text(String::from("k"))).unwrap(), &Value::Integer(2));
        assert_eq!(
            map.get(&Value::Text(String::from("x"))).unwrap_err().get_error_name(),
            "MissingKey"
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Tuple(pair()).to_string(), "(1, a)");
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        let list = ListValue::new(Type::list(Type::Integer), vec![Value::Integer(1), Value::Integer(2)]);
        assert_eq!(Value::List(list).to_string(), "[1, 2]");
    }

    #[test]
    fn test_map_display_is_sorted() {
        let mut map = MapValue::new(Type::map(Type::Text, Type::Integer));
        map.insert(Value::Text(String::from("b")), Value::Integer(2));
        map.insert(Value::Text(String::from("a b")), Value::Integer(3));
        map.insert(Value::Text(String::from("a")), Value::Integer(1));

        assert_eq!(Value::Map(map).to_string(), "{a b: 3, a: 1, b: 2}");
    }
}
