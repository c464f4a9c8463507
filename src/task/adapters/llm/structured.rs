//! Schema-checked structured generation shared by the model adapters.

use crate::router::domain::JsonSchema;
use crate::task::ports::{ClassificationError, StructuredModel, StructuredRequest};
use serde::de::DeserializeOwned;

/// Requests one object, validates it against `schema`, and decodes it.
pub(super) async fn generate_validated<M, T>(
    model: &M,
    system: String,
    prompt: String,
    schema_name: &str,
    schema: JsonSchema,
) -> Result<T, ClassificationError>
where
    M: StructuredModel + ?Sized,
    T: DeserializeOwned,
{
    let request = StructuredRequest {
        system,
        prompt,
        schema_name: schema_name.to_owned(),
        schema,
    };
    let validator = request.schema.clone();
    let object = model.generate_object(request).await?;
    validator
        .validate(&object)
        .map_err(ClassificationError::SchemaMismatch)?;
    serde_json::from_value(object)
        .map_err(|err| ClassificationError::InvalidOutput(err.to_string()))
}
