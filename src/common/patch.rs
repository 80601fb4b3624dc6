// src/common/patch.rs

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Atualização parcial de um campo.
///
/// Usado com `#[serde(default)]`: chave ausente no JSON vira `Unset` (não mexe),
/// e para campos anuláveis (`Patch<Option<T>>`) um `null` explícito vira `Set(None)` (limpa).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Patch<T> {
    #[default]
    Unset,
    Set(T),
}

impl<T> Patch<T> {
    pub fn as_set(&self) -> Option<&T> {
        match self {
            Patch::Set(value) => Some(value),
            Patch::Unset => None,
        }
    }

    /// Aplica no destino. Retorna `true` se o valor foi escrito.
    pub fn apply_to(self, target: &mut T) -> bool {
        match self {
            Patch::Set(value) => {
                *target = value;
                true
            }
            Patch::Unset => false,
        }
    }
}

impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        T::deserialize(deserializer).map(Patch::Set)
    }
}

// `Unset` sai como `null`; use `skip_serializing_if` para omitir a chave
impl<T> Serialize for Patch<T>
where
    T: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Patch::Set(value) => value.serialize(serializer),
            Patch::Unset => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Debug, Deserialize, Serialize)]
    struct Payload {
        #[serde(default)]
        email: Patch<Option<String>>,
        #[serde(default)]
        name: Patch<String>,
    }

    #[test]
    fn absent_key_is_unset_and_null_clears() {
        let payload: Payload = serde_json::from_str(r#"{ "email": null }"#).unwrap();
        assert_eq!(payload.email, Patch::Set(None));
        assert_eq!(payload.name, Patch::Unset);

        let payload: Payload = serde_json::from_str(r#"{ "email": "a@b.com", "name": "Ravi" }"#).unwrap();
        assert_eq!(payload.email, Patch::Set(Some("a@b.com".to_string())));
        assert_eq!(payload.name, Patch::Set("Ravi".to_string()));
    }

    #[test]
    fn apply_to_only_writes_when_set() {
        let mut email = Some("old@x.com".to_string());

        assert!(!Patch::Unset.apply_to(&mut email));
        assert_eq!(email.as_deref(), Some("old@x.com"));

        assert!(Patch::Set(None).apply_to(&mut email));
        assert_eq!(email, None);
    }

    #[test]
    fn serializes_back_to_the_same_json() {
        let payload: Payload = serde_json::from_str(r#"{ "email": null, "name": "Ravi" }"#).unwrap();
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json, serde_json::json!({ "email": null, "name": "Ravi" }));

        let unset = serde_json::to_value(Patch::<String>::Unset).unwrap();
        assert_eq!(unset, serde_json::Value::Null);
    }
}
