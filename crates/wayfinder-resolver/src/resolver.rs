//! Spec parsing, `$ref` inlining, and endpoint extraction.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::error::ResolveError;
use crate::model::{Endpoint, Parameter, ParsedSpec};

/// HTTP methods recognized as operation keys under a path item.
const HTTP_METHODS: &[&str] = &[
    "get", "post", "put", "delete", "patch", "head", "options", "trace",
];

/// Parse an OpenAPI 3.x or Swagger 2.0 spec from JSON or YAML text and
/// flatten it into a [`ParsedSpec`] with all `$ref`s inlined.
pub fn resolve_spec(input: &str) -> Result<ParsedSpec, ResolveError> {
    let root = parse_document(input)?;
    let root_obj = root.as_object().ok_or(ResolveError::NotAnObject)?;

    let info = root_obj.get("info").and_then(Value::as_object);
    let title = info
        .and_then(|i| i.get("title"))
        .and_then(Value::as_str)
        .unwrap_or("Unknown API")
        .to_string();
    let version = info
        .and_then(|i| i.get("version"))
        .and_then(Value::as_str)
        .unwrap_or("1.0.0")
        .to_string();
    let description = info
        .and_then(|i| i.get("description"))
        .and_then(Value::as_str)
        .map(String::from);

    let schema_count = schema_components(root_obj).map(Map::len).unwrap_or(0);

    let resolver = RefResolver { root: &root };
    let endpoints = extract_endpoints(root_obj, &resolver);

    tracing::debug!(
        title = %title,
        endpoints = endpoints.len(),
        schemas = schema_count,
        "resolved spec"
    );

    Ok(ParsedSpec {
        title,
        version,
        description,
        endpoints,
    })
}

/// Attempt JSON first, then YAML.
///
/// YAML is decoded through `serde_yaml::Value` and re-encoded so numeric
/// mapping keys (unquoted `200:` status codes) become string keys.
fn parse_document(input: &str) -> Result<Value, ResolveError> {
    if let Ok(value) = serde_json::from_str(input) {
        return Ok(value);
    }
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(input).map_err(|e| ResolveError::Parse(e.to_string()))?;
    serde_json::to_value(yaml).map_err(|e| ResolveError::Parse(e.to_string()))
}

/// The reusable-schema table: OpenAPI 3.x `components.schemas` when
/// non-empty, otherwise Swagger 2.0 `definitions`.
pub fn schema_components(root: &Map<String, Value>) -> Option<&Map<String, Value>> {
    let openapi3 = root
        .get("components")
        .and_then(|c| c.get("schemas"))
        .and_then(Value::as_object);
    match openapi3 {
        Some(schemas) if !schemas.is_empty() => Some(schemas),
        _ => root.get("definitions").and_then(Value::as_object),
    }
}

/// Inlines `#/...` pointers by walking the top-level document.
///
/// Resolution is a depth-first walk carrying the set of pointers on the
/// active path; re-encountering one short-circuits to the unresolved
/// reference marker, so self-referential schemas terminate.
struct RefResolver<'a> {
    root: &'a Value,
}

impl RefResolver<'_> {
    /// Return a copy of `value` with every reachable `$ref` inlined.
    ///
    /// Idempotent on ref-free values. A pointer that does not start with
    /// `#/`, walks off the document, or cycles is left as the original
    /// unresolved object.
    fn resolve(&self, value: &Value) -> Value {
        let mut in_flight = HashSet::new();
        self.resolve_inner(value, &mut in_flight)
    }

    fn resolve_inner(&self, value: &Value, in_flight: &mut HashSet<String>) -> Value {
        let Some(obj) = value.as_object() else {
            return value.clone();
        };

        let Some(pointer) = obj.get("$ref").and_then(Value::as_str) else {
            // No ref here; rebuild the mapping, resolving nested values.
            let mut resolved = Map::with_capacity(obj.len());
            for (key, nested) in obj {
                let nested = match nested {
                    Value::Array(items) => Value::Array(
                        items
                            .iter()
                            .map(|item| self.resolve_inner(item, in_flight))
                            .collect(),
                    ),
                    other => self.resolve_inner(other, in_flight),
                };
                resolved.insert(key.clone(), nested);
            }
            return Value::Object(resolved);
        };

        if !pointer.starts_with("#/") {
            tracing::trace!(pointer, "external reference left unresolved");
            return value.clone();
        }
        if in_flight.contains(pointer) {
            // Cycle: keep the reference marker instead of recursing.
            tracing::trace!(pointer, "cyclic reference left unresolved");
            return value.clone();
        }

        let mut current = self.root;
        for segment in pointer[2..].split('/') {
            match current.get(segment) {
                Some(next) => current = next,
                None => {
                    tracing::trace!(pointer, "dangling reference left unresolved");
                    return value.clone();
                }
            }
        }

        in_flight.insert(pointer.to_string());
        let resolved = self.resolve_inner(current, in_flight);
        in_flight.remove(pointer);
        resolved
    }
}

fn extract_endpoints(root: &Map<String, Value>, resolver: &RefResolver) -> Vec<Endpoint> {
    let mut endpoints = Vec::new();

    let Some(paths) = root.get("paths").and_then(Value::as_object) else {
        return endpoints;
    };

    for (path, path_item) in paths {
        let Some(path_obj) = path_item.as_object() else {
            continue;
        };

        // Path-level parameters, inherited by every operation below.
        let path_params = raw_parameters(path_obj);

        for method in HTTP_METHODS {
            let Some(op_obj) = path_obj.get(*method).and_then(Value::as_object) else {
                continue;
            };
            endpoints.push(build_endpoint(path, method, op_obj, &path_params, resolver));
        }
    }

    endpoints
}

/// The raw `parameters` array of a path item or operation object.
fn raw_parameters(obj: &Map<String, Value>) -> Vec<Value> {
    obj.get("parameters")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn build_endpoint(
    path: &str,
    method: &str,
    op: &Map<String, Value>,
    path_params: &[Value],
    resolver: &RefResolver,
) -> Endpoint {
    // Concatenate path-level and operation-level parameters. No dedup:
    // loose upstream documents repeat parameters across both levels and
    // the duplication is preserved as-is.
    let mut resolved_params: Vec<Value> = Vec::with_capacity(path_params.len());
    for raw in path_params.iter().chain(raw_parameters(op).iter()) {
        resolved_params.push(resolver.resolve(raw));
    }

    let parameters = resolved_params.iter().map(build_parameter).collect();
    let request_body_schema = request_body_schema(op, &resolved_params, resolver);
    let response_schema = response_schema(op, resolver);

    let tags = op
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    let security = op
        .get("security")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    Endpoint {
        path: path.to_string(),
        method: method.to_uppercase(),
        summary: string_field(op, "summary"),
        description: string_field(op, "description"),
        operation_id: string_field(op, "operationId"),
        tags,
        parameters,
        request_body_schema,
        response_schema,
        security,
    }
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(String::from)
}

/// Build a [`Parameter`] from an already-resolved parameter value.
fn build_parameter(param: &Value) -> Parameter {
    Parameter {
        name: param
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        location: param
            .get("in")
            .and_then(Value::as_str)
            .unwrap_or("query")
            .to_string(),
        required: param
            .get("required")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        description: param
            .get("description")
            .and_then(Value::as_str)
            .map(String::from),
        schema: param.get("schema").cloned(),
    }
}

/// OpenAPI 3.x `requestBody.content["application/json"].schema`, falling
/// back to a Swagger 2.0 body parameter (`in: body`).
fn request_body_schema(
    op: &Map<String, Value>,
    resolved_params: &[Value],
    resolver: &RefResolver,
) -> Option<Value> {
    if let Some(body) = op.get("requestBody") {
        let body = resolver.resolve(body);
        if let Some(schema) = json_content_schema(&body) {
            return Some(schema.clone());
        }
    }

    resolved_params
        .iter()
        .find(|p| p.get("in").and_then(Value::as_str) == Some("body"))
        .and_then(|p| p.get("schema"))
        .cloned()
}

/// Schema of the first success response: `200`, then `201`, then
/// `default`; the first present and non-empty entry wins.
fn response_schema(op: &Map<String, Value>, resolver: &RefResolver) -> Option<Value> {
    let responses = op.get("responses").and_then(Value::as_object)?;

    let response = ["200", "201", "default"]
        .iter()
        .find_map(|code| responses.get(*code).filter(|v| !is_empty_value(v)))?;
    let response = resolver.resolve(response);

    if let Some(schema) = json_content_schema(&response) {
        return Some(schema.clone());
    }
    // Swagger 2.0 puts the schema inline on the response.
    response.get("schema").cloned()
}

fn json_content_schema(value: &Value) -> Option<&Value> {
    value
        .get("content")
        .and_then(|c| c.get("application/json"))
        .and_then(|j| j.get("schema"))
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(obj) => obj.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PETSTORE: &str = r#"
openapi: "3.0.0"
info:
  title: Petstore
  version: "1.0.0"
  description: A sample pet store
paths:
  /pets:
    get:
      operationId: listPets
      summary: List all pets
      tags: [pets]
      parameters:
        - name: limit
          in: query
          required: false
          schema:
            type: integer
      responses:
        '200':
          content:
            application/json:
              schema:
                type: array
                items:
                  $ref: '#/components/schemas/Pet'
    post:
      operationId: createPet
      summary: Create a pet
      tags: [pets]
      requestBody:
        required: true
        content:
          application/json:
            schema:
              $ref: '#/components/schemas/Pet'
      responses:
        '201':
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/Pet'
  /pets/{petId}:
    parameters:
      - name: petId
        in: path
        required: true
        schema:
          type: string
    get:
      operationId: getPetById
      summary: Info for a specific pet
      tags: [pets]
      responses:
        '200':
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/Pet'
components:
  schemas:
    Pet:
      type: object
      required: [name]
      properties:
        name:
          type: string
        tag:
          type: string
"#;

    fn find<'a>(spec: &'a ParsedSpec, method: &str, path: &str) -> &'a Endpoint {
        spec.endpoints
            .iter()
            .find(|e| e.method == method && e.path == path)
            .unwrap_or_else(|| panic!("no endpoint {method} {path}"))
    }

    #[test]
    fn one_endpoint_per_path_and_verb() {
        let spec = resolve_spec(PETSTORE).unwrap();
        assert_eq!(spec.title, "Petstore");
        assert_eq!(spec.version, "1.0.0");
        assert_eq!(spec.description.as_deref(), Some("A sample pet store"));
        assert_eq!(spec.endpoints.len(), 3);
        for endpoint in &spec.endpoints {
            assert_eq!(endpoint.method, endpoint.method.to_uppercase());
        }
    }

    #[test]
    fn path_level_parameters_inherited() {
        let spec = resolve_spec(PETSTORE).unwrap();
        let get_pet = find(&spec, "GET", "/pets/{petId}");

        assert_eq!(get_pet.parameters.len(), 1);
        let param = &get_pet.parameters[0];
        assert_eq!(param.name, "petId");
        assert_eq!(param.location, "path");
        assert!(param.required);
    }

    #[test]
    fn request_body_ref_is_inlined() {
        let spec = resolve_spec(PETSTORE).unwrap();
        let create = find(&spec, "POST", "/pets");

        let schema = create.request_body_schema.as_ref().unwrap();
        assert!(schema.get("$ref").is_none(), "schema still a raw $ref");
        let properties = schema.get("properties").unwrap();
        assert!(properties.get("name").is_some());
    }

    #[test]
    fn response_schema_resolved_through_ref() {
        let spec = resolve_spec(PETSTORE).unwrap();
        let list = find(&spec, "GET", "/pets");

        let schema = list.response_schema.as_ref().unwrap();
        assert_eq!(schema.get("type").and_then(Value::as_str), Some("array"));
        let items = schema.get("items").unwrap();
        assert!(items.get("properties").is_some());
    }

    #[test]
    fn operation_metadata_extracted() {
        let spec = resolve_spec(PETSTORE).unwrap();
        let list = find(&spec, "GET", "/pets");

        assert_eq!(list.operation_id.as_deref(), Some("listPets"));
        assert_eq!(list.summary.as_deref(), Some("List all pets"));
        assert_eq!(list.tags, vec!["pets".to_string()]);
    }

    #[test]
    fn parse_json_document() {
        let doc = json!({
            "openapi": "3.0.0",
            "info": {"title": "JSON API", "version": "2.0"},
            "paths": {"/things": {"get": {"operationId": "listThings"}}}
        });
        let spec = resolve_spec(&doc.to_string()).unwrap();
        assert_eq!(spec.title, "JSON API");
        assert_eq!(spec.endpoints.len(), 1);
        assert_eq!(spec.endpoints[0].method, "GET");
    }

    #[test]
    fn reject_unparseable_input() {
        let err = resolve_spec("{invalid").unwrap_err();
        assert!(matches!(err, ResolveError::Parse(_)));
    }

    #[test]
    fn reject_scalar_document() {
        let err = resolve_spec("just a sentence").unwrap_err();
        assert!(matches!(err, ResolveError::NotAnObject));
    }

    #[test]
    fn missing_info_falls_back_to_defaults() {
        let spec = resolve_spec("paths: {}").unwrap();
        assert_eq!(spec.title, "Unknown API");
        assert_eq!(spec.version, "1.0.0");
        assert!(spec.description.is_none());
        assert!(spec.endpoints.is_empty());
    }

    #[test]
    fn parameters_concatenated_without_dedup() {
        let doc = r#"
openapi: "3.0.0"
info: {title: Dup, version: "1.0"}
paths:
  /items/{id}:
    parameters:
      - name: id
        in: path
        required: true
    get:
      parameters:
        - name: id
          in: path
          required: true
"#;
        let spec = resolve_spec(doc).unwrap();
        // Both levels kept, in order, as the source document wrote them.
        assert_eq!(spec.endpoints[0].parameters.len(), 2);
    }

    #[test]
    fn swagger2_body_parameter_becomes_request_body() {
        let doc = r#"
swagger: "2.0"
info: {title: Legacy, version: "1.0"}
paths:
  /users:
    post:
      parameters:
        - name: body
          in: body
          required: true
          schema:
            $ref: '#/definitions/User'
      responses:
        '200':
          schema:
            $ref: '#/definitions/User'
definitions:
  User:
    type: object
    properties:
      email:
        type: string
"#;
        let spec = resolve_spec(doc).unwrap();
        let post = &spec.endpoints[0];

        let body = post.request_body_schema.as_ref().unwrap();
        assert!(body.get("properties").and_then(|p| p.get("email")).is_some());

        // Swagger 2.0 inline response schema, same ref target.
        let response = post.response_schema.as_ref().unwrap();
        assert!(response.get("properties").is_some());
    }

    #[test]
    fn dialects_resolve_equivalent_refs_identically() {
        let swagger2 = r#"
swagger: "2.0"
info: {title: A, version: "1"}
paths:
  /pets:
    post:
      parameters:
        - name: body
          in: body
          schema:
            $ref: '#/definitions/Pet'
      responses: {}
definitions:
  Pet:
    type: object
    properties:
      name: {type: string}
"#;
        let openapi3 = r#"
openapi: "3.0.0"
info: {title: B, version: "1"}
paths:
  /pets:
    post:
      requestBody:
        content:
          application/json:
            schema:
              $ref: '#/components/schemas/Pet'
      responses: {}
components:
  schemas:
    Pet:
      type: object
      properties:
        name: {type: string}
"#;
        let old = resolve_spec(swagger2).unwrap();
        let new = resolve_spec(openapi3).unwrap();
        assert_eq!(
            old.endpoints[0].request_body_schema,
            new.endpoints[0].request_body_schema
        );
    }

    #[test]
    fn response_priority_skips_empty_entries() {
        let doc = r#"
openapi: "3.0.0"
info: {title: P, version: "1"}
paths:
  /a:
    get:
      responses:
        '200': {}
        '201':
          content:
            application/json:
              schema: {type: string}
  /b:
    get:
      responses:
        default:
          content:
            application/json:
              schema: {type: integer}
"#;
        let spec = resolve_spec(doc).unwrap();
        let a = find(&spec, "GET", "/a");
        assert_eq!(
            a.response_schema.as_ref().and_then(|s| s.get("type")),
            Some(&json!("string"))
        );
        let b = find(&spec, "GET", "/b");
        assert_eq!(
            b.response_schema.as_ref().and_then(|s| s.get("type")),
            Some(&json!("integer"))
        );
    }

    #[test]
    fn unquoted_numeric_status_keys() {
        // YAML writes status codes as numbers; they must still match the
        // "200" lookup after decoding.
        let doc = r#"
openapi: "3.0.0"
info: {title: N, version: "1"}
paths:
  /n:
    get:
      responses:
        200:
          content:
            application/json:
              schema: {type: boolean}
"#;
        let spec = resolve_spec(doc).unwrap();
        assert!(spec.endpoints[0].response_schema.is_some());
    }

    #[test]
    fn resolution_is_idempotent_on_ref_free_values() {
        let root = json!({});
        let resolver = RefResolver { root: &root };
        let value = json!({
            "type": "object",
            "properties": {"name": {"type": "string"}},
            "required": ["name"]
        });
        assert_eq!(resolver.resolve(&value), value);
    }

    #[test]
    fn unresolvable_ref_returns_original() {
        let root = json!({"components": {"schemas": {}}});
        let resolver = RefResolver { root: &root };

        let missing = json!({"$ref": "#/components/schemas/Ghost"});
        assert_eq!(resolver.resolve(&missing), missing);

        let external = json!({"$ref": "other.yaml#/Pet"});
        assert_eq!(resolver.resolve(&external), external);
    }

    #[test]
    fn self_referential_schema_terminates() {
        let root = json!({
            "components": {
                "schemas": {
                    "Node": {
                        "type": "object",
                        "properties": {
                            "value": {"type": "string"},
                            "next": {"$ref": "#/components/schemas/Node"}
                        }
                    }
                }
            }
        });
        let resolver = RefResolver { root: &root };

        let resolved = resolver.resolve(&json!({"$ref": "#/components/schemas/Node"}));
        // One level inlined; the cyclic hop stays a reference marker.
        let next = resolved
            .get("properties")
            .and_then(|p| p.get("next"))
            .unwrap();
        assert_eq!(
            next.get("$ref").and_then(Value::as_str),
            Some("#/components/schemas/Node")
        );
    }

    #[test]
    fn mutually_recursive_schemas_terminate() {
        let root = json!({
            "definitions": {
                "A": {"type": "object", "properties": {"b": {"$ref": "#/definitions/B"}}},
                "B": {"type": "object", "properties": {"a": {"$ref": "#/definitions/A"}}}
            }
        });
        let resolver = RefResolver { root: &root };

        let resolved = resolver.resolve(&json!({"$ref": "#/definitions/A"}));
        let inner = resolved
            .get("properties")
            .and_then(|p| p.get("b"))
            .and_then(|b| b.get("properties"))
            .and_then(|p| p.get("a"))
            .unwrap();
        assert_eq!(
            inner.get("$ref").and_then(Value::as_str),
            Some("#/definitions/A")
        );
    }

    #[test]
    fn refs_resolved_inside_arrays() {
        let root = json!({"definitions": {"Tag": {"type": "string"}}});
        let resolver = RefResolver { root: &root };

        let value = json!({"allOf": [{"$ref": "#/definitions/Tag"}, {"type": "object"}]});
        let resolved = resolver.resolve(&value);
        assert_eq!(resolved["allOf"][0], json!({"type": "string"}));
    }

    #[test]
    fn component_table_prefers_openapi3_schemas() {
        let both = json!({
            "components": {"schemas": {"Pet": {"type": "object"}}},
            "definitions": {"Old": {"type": "string"}}
        });
        let table = schema_components(both.as_object().unwrap()).unwrap();
        assert!(table.contains_key("Pet"));

        let empty_components = json!({
            "components": {"schemas": {}},
            "definitions": {"Old": {"type": "string"}}
        });
        let table = schema_components(empty_components.as_object().unwrap()).unwrap();
        assert!(table.contains_key("Old"));
    }

    #[test]
    fn security_passed_through() {
        let doc = r#"
openapi: "3.0.0"
info: {title: S, version: "1"}
paths:
  /secure:
    get:
      security:
        - api_key: []
"#;
        let spec = resolve_spec(doc).unwrap();
        assert_eq!(spec.endpoints[0].security.len(), 1);
    }

    #[test]
    fn non_verb_path_keys_ignored() {
        let doc = r#"
openapi: "3.0.0"
info: {title: V, version: "1"}
paths:
  /x:
    summary: not an operation
    description: also not an operation
    get: {}
"#;
        let spec = resolve_spec(doc).unwrap();
        assert_eq!(spec.endpoints.len(), 1);
        assert_eq!(spec.endpoints[0].method, "GET");
    }
}
