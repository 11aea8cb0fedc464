use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use jsonschema::{Retrieve, Uri};
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use crate::config::CompilerConfig;
use crate::error::{Result, SchemaError};
use crate::fetcher::DocumentFetcher;
use crate::keywords::check_known_keywords;
use crate::validator::CompiledValidator;

/// Keywords whose values are instance data, never subschemas.
const DATA_KEYWORDS: [&str; 4] = ["const", "enum", "default", "examples"];

/// Compiles schema documents, fetching externally referenced documents first.
pub struct SchemaCompiler {
    fetcher: Arc<DocumentFetcher>,
    config: CompilerConfig,
}

impl SchemaCompiler {
    /// Create a compiler with default (strict) config.
    pub fn new(fetcher: Arc<DocumentFetcher>) -> Self {
        Self::with_config(fetcher, CompilerConfig::default())
    }

    /// Create a compiler with explicit config.
    pub fn with_config(fetcher: Arc<DocumentFetcher>, config: CompilerConfig) -> Self {
        Self { fetcher, config }
    }

    /// Fetch a schema by URL and compile it.
    ///
    /// Relative references in a document without an `$id` resolve against
    /// the URL it was fetched from.
    pub async fn compile_url(&self, url: &str) -> Result<CompiledValidator> {
        let source = self.fetcher.normalize(url)?;
        let document = self.fetcher.fetch(url).await?;
        self.compile_document(&document, Some(source)).await
    }

    /// Compile an in-memory schema document.
    pub async fn compile(&self, document: &Value) -> Result<CompiledValidator> {
        self.compile_document(document, None).await
    }

    pub fn fetcher(&self) -> &Arc<DocumentFetcher> {
        &self.fetcher
    }

    async fn compile_document(
        &self,
        document: &Value,
        source: Option<String>,
    ) -> Result<CompiledValidator> {
        if self.config.strict {
            check_known_keywords(document)?;
        }

        let mut root = document.clone();
        if let Some(source) = &source {
            assign_base(&mut root, source);
        }

        let documents = self.prefetch_references(&root).await?;
        debug!(
            source = source.as_deref().unwrap_or("<inline>"),
            referenced = documents.len(),
            "compiling schema"
        );

        let validator = jsonschema::options()
            .should_validate_formats(self.config.validate_formats)
            .should_ignore_unknown_formats(!self.config.strict)
            .with_retriever(PrefetchedDocuments { documents })
            .build(&root)
            .map_err(|err| SchemaError::CompileFailed(err.to_string()))?;

        Ok(CompiledValidator::new(validator, source))
    }

    /// Fetch every external document reachable through `$ref`, transitively.
    async fn prefetch_references(&self, root: &Value) -> Result<HashMap<String, Value>> {
        let mut documents = HashMap::new();
        let mut pending = external_references(root, None);

        while let Some(target) = pending.pop() {
            let key = reference_key(target.as_str());
            if documents.contains_key(&key) {
                continue;
            }

            // Fetch with the identifier as written; the key only serves lookups.
            let document = self.fetcher.fetch(target.as_str()).await?;
            if self.config.strict {
                check_known_keywords(&document).map_err(|err| in_document(target.as_str(), err))?;
            }

            pending.extend(external_references(&document, Some(&target)));
            documents.insert(key, document);
        }

        Ok(documents)
    }
}

/// Serves `$ref` lookups from documents fetched ahead of compilation.
struct PrefetchedDocuments {
    documents: HashMap<String, Value>,
}

impl Retrieve for PrefetchedDocuments {
    fn retrieve(
        &self,
        uri: &Uri<String>,
    ) -> std::result::Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let key = reference_key(uri.as_str());
        self.documents
            .get(&key)
            .cloned()
            .ok_or_else(|| format!("referenced document {} was not prefetched", uri.as_str()).into())
    }
}

/// Lookup key for a referenced document.
///
/// The resolver lower-cases every host before retrieval, including the opaque
/// host of `ipfs://` URLs that `url` keeps verbatim, so keys do the same.
fn reference_key(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw) else {
        return raw.to_string();
    };
    url.set_fragment(None);
    if let Some(host) = url.host_str().map(str::to_ascii_lowercase) {
        // Only fails for hosts `url` would not have parsed in the first place.
        let _ = url.set_host(Some(&host));
    }
    url.to_string()
}

fn in_document(url: &str, err: SchemaError) -> SchemaError {
    match err {
        SchemaError::CompileFailed(reason) => SchemaError::CompileFailed(format!("{url}: {reason}")),
        other => other,
    }
}

fn assign_base(root: &mut Value, source: &str) {
    let Value::Object(map) = root else {
        return;
    };
    let keyword = id_keyword(map);
    if !map.contains_key(keyword) {
        map.insert(keyword.to_string(), Value::String(source.to_string()));
    }
}

fn id_keyword(map: &Map<String, Value>) -> &'static str {
    match map.get("$schema") {
        Some(Value::String(dialect)) if dialect.contains("draft-04") => "id",
        _ => "$id",
    }
}

fn scoped_base(map: &Map<String, Value>, base: Option<&Url>) -> Option<Url> {
    let Some(Value::String(id)) = map.get(id_keyword(map)) else {
        return None;
    };
    match Url::parse(id) {
        Ok(url) => Some(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => base.and_then(|base| base.join(id).ok()),
        Err(_) => None,
    }
}

/// External documents a schema refers to, excluding its own resources.
fn external_references(document: &Value, base: Option<&Url>) -> Vec<Url> {
    let mut targets = Vec::new();
    let mut declared = HashSet::new();
    if let Some(base) = base {
        declared.insert(without_fragment(base));
    }
    walk_references(document, base, &mut targets, &mut declared);

    targets
        .into_iter()
        .filter(|target| !declared.contains(target))
        .filter(|target| target.host_str() != Some("json-schema.org"))
        .collect()
}

fn walk_references(
    value: &Value,
    base: Option<&Url>,
    targets: &mut Vec<Url>,
    declared: &mut HashSet<Url>,
) {
    match value {
        Value::Object(map) => {
            let scoped = scoped_base(map, base);
            if let Some(scoped) = &scoped {
                declared.insert(without_fragment(scoped));
            }
            let base = scoped.as_ref().or(base);

            if let Some(Value::String(reference)) = map.get("$ref") {
                if let Some(target) = resolve_reference(reference, base) {
                    targets.push(target);
                }
            }

            for (key, child) in map {
                if key != "$ref" && !DATA_KEYWORDS.contains(&key.as_str()) {
                    walk_references(child, base, targets, declared);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                walk_references(item, base, targets, declared);
            }
        }
        _ => {}
    }
}

fn resolve_reference(reference: &str, base: Option<&Url>) -> Option<Url> {
    let resolved = match Url::parse(reference) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => base?.join(reference).ok()?,
        Err(_) => return None,
    };
    if !matches!(resolved.scheme(), "http" | "https" | "ipfs") {
        return None;
    }
    Some(without_fragment(&resolved))
}

fn without_fragment(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_fragment(None);
    url
}
