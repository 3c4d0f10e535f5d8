//! Tantivy implementation of [`DocumentIndex`].
//!
//! Every field of the policy table gets a tantivy field analyzed as the
//! table says. `Label` and `Env` are JSON fields so `Label.<key>:value`
//! queries resolve to the value of one label. Searches return stored values
//! from a serialized copy of the whole document, filtered by the policy.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use dim_core::schema::{self, Analyzer, FieldRef};
use dim_core::{ImageQuery, IndexedImage};
use parking_lot::Mutex;
use serde_json::json;
use tantivy::collector::{Count, TopDocs};
use tantivy::query::{AllQuery, BooleanQuery, FuzzyTermQuery, Occur, Query, QueryParser, TermQuery};
use tantivy::schema::{
    Field, FieldType, IndexRecordOption, JsonObjectOptions, Schema, TextFieldIndexing,
    TextOptions, Value, INDEXED, STORED, STRING, TEXT,
};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};

use crate::engine::{DocumentIndex, DocumentMatch, FieldValue, SearchRequest, SearchResult};
use crate::error::{IndexError, Result};

/// Stored field holding the serialized document.
const SOURCE: &str = "_source";

/// Smallest writer memory budget tantivy accepts for one thread.
const MIN_WRITER_HEAP_BYTES: usize = 15_000_000;

/// Image index backed by tantivy.
pub struct TantivyIndex {
    index: Index,
    reader: IndexReader,
    writer: Mutex<Option<IndexWriter>>,
    fields: Fields,
}

#[derive(Debug, Clone)]
struct Fields {
    full_name: Field,
    source: Field,
    default_scope: Vec<Field>,
}

impl TantivyIndex {
    /// Creates an empty index held in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer cannot be created.
    pub fn create_in_ram(writer_heap_bytes: usize) -> Result<Self> {
        let index = Index::create_in_ram(image_schema());
        Self::writable(index, writer_heap_bytes)
    }

    /// Creates an empty index in `path`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or already holds
    /// an index.
    pub fn create_in_dir(path: &Path, writer_heap_bytes: usize) -> Result<Self> {
        std::fs::create_dir_all(path).map_err(|e| IndexError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let index = Index::create_in_dir(path, image_schema())?;
        tracing::info!(path = %path.display(), "Created index");
        Self::writable(index, writer_heap_bytes)
    }

    /// Opens an existing index for searching. Writes on the returned index
    /// fail with [`IndexError::Closed`].
    ///
    /// # Errors
    ///
    /// Returns an error if `path` does not hold an image index.
    pub fn open(path: &Path) -> Result<Self> {
        let index = Index::open_in_dir(path)?;
        let fields = Fields::resolve(&index.schema())?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        tracing::info!(path = %path.display(), "Opened index");

        Ok(Self {
            index,
            reader,
            writer: Mutex::new(None),
            fields,
        })
    }

    /// Opens the most recent build under `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` cannot be read, holds no build, or the
    /// newest build cannot be opened.
    pub fn open_latest(root: &Path) -> Result<Self> {
        let path = latest_build(root)?;
        Self::open(&path)
    }

    /// Opens an existing index for searching and writing.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` does not hold an image index or another
    /// writer holds its lock.
    pub fn open_writable(path: &Path, writer_heap_bytes: usize) -> Result<Self> {
        let index = Index::open_in_dir(path)?;
        tracing::info!(path = %path.display(), "Opened index for writing");
        Self::writable(index, writer_heap_bytes)
    }

    /// Opens the most recent build under `root` for searching and writing.
    ///
    /// # Errors
    ///
    /// See [`open_latest`](Self::open_latest) and
    /// [`open_writable`](Self::open_writable).
    pub fn open_latest_writable(root: &Path, writer_heap_bytes: usize) -> Result<Self> {
        let path = latest_build(root)?;
        Self::open_writable(&path, writer_heap_bytes)
    }

    /// Number of documents visible to searches.
    #[must_use]
    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    fn writable(index: Index, writer_heap_bytes: usize) -> Result<Self> {
        let fields = Fields::resolve(&index.schema())?;
        let writer = index.writer_with_num_threads(1, writer_heap_bytes.max(MIN_WRITER_HEAP_BYTES))?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        Ok(Self {
            index,
            reader,
            writer: Mutex::new(Some(writer)),
            fields,
        })
    }

    /// Applies `op` with the writer. Nothing is committed.
    fn write<F>(&self, op: F) -> Result<()>
    where
        F: FnOnce(&mut IndexWriter) -> Result<()>,
    {
        let mut guard = self.writer.lock();
        let writer = guard.as_mut().ok_or(IndexError::Closed)?;
        op(writer)
    }

    fn document(&self, id: &str, image: &IndexedImage) -> Result<TantivyDocument> {
        let source = serde_json::to_string(image)
            .map_err(|e| IndexError::engine(format!("cannot serialize '{id}': {e}")))?;
        let labels: BTreeMap<&str, String> = image
            .labels
            .iter()
            .map(|(key, value)| (key.as_str(), value.to_string()))
            .collect();

        let mut object = serde_json::Map::new();
        object.insert(schema::ID.into(), json!(image.id));
        object.insert(schema::NAME.into(), json!(image.name));
        object.insert(schema::TAG.into(), json!(image.tag));
        object.insert(schema::FULL_NAME.into(), json!(id));
        object.insert(schema::AUTHOR.into(), json!(image.author));
        object.insert(schema::COMMENT.into(), json!(image.comment));
        if let Some(created) = image.created {
            object.insert(schema::CREATED.into(), json!(created.to_rfc3339()));
        }
        object.insert(schema::LABELS.into(), json!(image.labels.keys().collect::<Vec<_>>()));
        object.insert(schema::LABEL.into(), json!(labels));
        object.insert(schema::ENVS.into(), json!(image.env.keys().collect::<Vec<_>>()));
        object.insert(schema::ENV.into(), json!(image.env));
        object.insert(schema::VOLUMES.into(), json!(image.volumes));
        object.insert(schema::EXPOSED_PORTS.into(), json!(image.exposed_ports));
        object.insert(SOURCE.into(), json!(source));

        let json = serde_json::Value::Object(object).to_string();
        TantivyDocument::parse_json(&self.index.schema(), &json)
            .map_err(|e| IndexError::engine(format!("cannot build document '{id}': {e}")))
    }

    fn compile(&self, query: &ImageQuery) -> Result<Box<dyn Query>> {
        Ok(match query {
            ImageQuery::MatchAll => Box::new(AllQuery),
            ImageQuery::Fuzzy {
                field,
                term,
                distance,
            } => Box::new(FuzzyTermQuery::new(
                self.term(field, term)?,
                *distance,
                true,
            )),
            ImageQuery::Term { field, value } => Box::new(TermQuery::new(
                self.term(field, value)?,
                IndexRecordOption::Basic,
            )),
            ImageQuery::QueryString(text) => {
                QueryParser::for_index(&self.index, self.fields.default_scope.clone())
                    .parse_query(text)?
            }
            ImageQuery::DocIds(ids) => Box::new(BooleanQuery::new(
                ids.iter()
                    .map(|id| {
                        let term = Term::from_field_text(self.fields.full_name, id);
                        let clause: Box<dyn Query> =
                            Box::new(TermQuery::new(term, IndexRecordOption::Basic));
                        (Occur::Should, clause)
                    })
                    .collect(),
            )),
            ImageQuery::Should(clauses) => Box::new(BooleanQuery::new(
                clauses
                    .iter()
                    .map(|clause| Ok((Occur::Should, self.compile(clause)?)))
                    .collect::<Result<Vec<_>>>()?,
            )),
        })
    }

    /// Builds an exact term for a named field.
    fn term(&self, name: &str, value: &str) -> Result<Term> {
        let schema = self.index.schema();
        let field = schema
            .get_field(name)
            .map_err(|_| IndexError::query(format!("unknown field '{name}'")))?;

        match schema.get_field_entry(field).field_type() {
            FieldType::Str(_) => Ok(Term::from_field_text(field, value)),
            FieldType::U64(_) => value
                .parse::<u64>()
                .map(|number| Term::from_field_u64(field, number))
                .map_err(|_| IndexError::query(format!("'{value}' is not a valid {name}"))),
            _ => Err(IndexError::query(format!(
                "field '{name}' does not support term queries"
            ))),
        }
    }

    fn project(&self, doc: &TantivyDocument, score: f32, fields: &[String]) -> Result<DocumentMatch> {
        let source = doc
            .get_first(self.fields.source)
            .and_then(|value| value.as_str())
            .ok_or_else(|| IndexError::engine("document has no stored source"))?;
        let image: IndexedImage = serde_json::from_str(source)
            .map_err(|e| IndexError::engine(format!("corrupt stored document: {e}")))?;

        let mut projected = BTreeMap::new();
        for name in fields {
            let Some(field) = FieldRef::resolve(name).filter(FieldRef::is_stored) else {
                continue;
            };
            if let Some(value) = FieldValue::from_values(stored_values(&image, field)) {
                projected.insert(name.clone(), value);
            }
        }

        Ok(DocumentMatch {
            id: image.full_name,
            score,
            fields: projected,
        })
    }
}

impl DocumentIndex for TantivyIndex {
    fn index(&self, id: &str, image: &IndexedImage) -> Result<()> {
        self.stage(id, image)?;
        self.flush()
    }

    fn stage(&self, id: &str, image: &IndexedImage) -> Result<()> {
        tracing::debug!(image_id = %image.id, full_name = %id, "Indexing image");
        let document = self.document(id, image)?;
        let key = Term::from_field_text(self.fields.full_name, id);
        self.write(|writer| {
            writer.delete_term(key);
            writer.add_document(document)?;
            Ok(())
        })
    }

    fn flush(&self) -> Result<()> {
        self.write(|writer| {
            writer.commit()?;
            Ok(())
        })?;
        self.reader.reload()?;
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        tracing::debug!(full_name = %id, "Deleting document");
        let key = Term::from_field_text(self.fields.full_name, id);
        self.write(|writer| {
            writer.delete_term(key);
            Ok(())
        })?;
        self.flush()
    }

    fn search(&self, request: &SearchRequest) -> Result<SearchResult> {
        let query = self.compile(&request.query)?;
        let searcher = self.reader.searcher();

        let count = searcher.search(query.as_ref(), &Count)?;
        let total = u64::try_from(count).unwrap_or(u64::MAX);

        let hits = if request.size == 0 {
            Vec::new()
        } else {
            let collector = TopDocs::with_limit(request.size).and_offset(request.from);
            searcher
                .search(query.as_ref(), &collector)?
                .into_iter()
                .map(|(score, address)| {
                    let doc: TantivyDocument = searcher.doc(address)?;
                    self.project(&doc, score, &request.fields)
                })
                .collect::<Result<Vec<_>>>()?
        };

        tracing::debug!(total, returned = hits.len(), "Search executed");
        Ok(SearchResult { total, hits })
    }

    fn close(&self) -> Result<()> {
        let Some(mut writer) = self.writer.lock().take() else {
            return Ok(());
        };
        writer.commit()?;
        writer.wait_merging_threads()?;
        self.reader.reload()?;
        tracing::info!(documents = self.num_docs(), "Index closed");
        Ok(())
    }
}

impl Fields {
    fn resolve(schema: &Schema) -> Result<Self> {
        let get = |name: &str| {
            schema
                .get_field(name)
                .map_err(|_| IndexError::engine(format!("not an image index: missing field '{name}'")))
        };

        Ok(Self {
            full_name: get(schema::FULL_NAME)?,
            source: get(SOURCE)?,
            default_scope: schema::default_scope()
                .map(get)
                .collect::<Result<Vec<_>>>()?,
        })
    }
}

/// Lays out the tantivy schema from the field policy table.
fn image_schema() -> Schema {
    let mut builder = Schema::builder();

    for policy in schema::IMAGE_FIELDS {
        match policy.analyzer {
            Analyzer::Keyword | Analyzer::Identifier => {
                builder.add_text_field(policy.name, STRING);
            }
            Analyzer::Simple => {
                builder.add_text_field(policy.name, TEXT);
            }
            Analyzer::Language => {
                builder.add_text_field(policy.name, stemmed_text());
            }
            Analyzer::DateTime => {
                builder.add_date_field(policy.name, INDEXED);
            }
            Analyzer::Dynamic if policy.name == schema::EXPOSED_PORTS => {
                builder.add_u64_field(policy.name, INDEXED);
            }
            Analyzer::Dynamic => {
                builder.add_text_field(policy.name, STRING);
            }
        }
    }

    builder.add_json_field(schema::LABEL, dotted_json());
    builder.add_json_field(schema::ENV, dotted_json());
    builder.add_text_field(SOURCE, STORED);
    builder.build()
}

fn stemmed_text() -> TextOptions {
    TextOptions::default().set_indexing_options(
        TextFieldIndexing::default()
            .set_tokenizer("en_stem")
            .set_index_option(IndexRecordOption::WithFreqsAndPositions),
    )
}

/// JSON text where `a.b` keys address the same path as query `Label.a.b`.
fn dotted_json() -> JsonObjectOptions {
    JsonObjectOptions::from(TEXT).set_expand_dots_enabled()
}

/// Stored values of `field`, empty when the document has none.
fn stored_values(image: &IndexedImage, field: FieldRef<'_>) -> Vec<String> {
    let scalar = |value: &str| {
        if value.is_empty() {
            Vec::new()
        } else {
            vec![value.to_string()]
        }
    };

    match field {
        FieldRef::Top(policy) => match policy.name {
            schema::NAME => scalar(&image.name),
            schema::TAG => scalar(&image.tag),
            schema::FULL_NAME => scalar(&image.full_name),
            schema::AUTHOR => scalar(&image.author),
            schema::COMMENT => scalar(&image.comment),
            schema::LABELS => image.labels.keys().cloned().collect(),
            schema::ENVS => image.env.keys().cloned().collect(),
            schema::VOLUMES => image.volumes.clone(),
            schema::EXPOSED_PORTS => image.exposed_ports.iter().map(ToString::to_string).collect(),
            _ => Vec::new(),
        },
        FieldRef::Label(key) => image
            .labels
            .get(key)
            .map(ToString::to_string)
            .into_iter()
            .collect(),
        FieldRef::Env(key) => image.env.get(key).cloned().into_iter().collect(),
    }
}

/// Finds the newest build directory under `root`.
fn latest_build(root: &Path) -> Result<PathBuf> {
    let io_error = |source| IndexError::Io {
        path: root.to_path_buf(),
        source,
    };

    let mut builds: Vec<PathBuf> = std::fs::read_dir(root)
        .map_err(io_error)?
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.path().is_dir())
        .filter(|entry| entry.file_name().to_str().is_some_and(is_build_dir_name))
        .map(|entry| entry.path())
        .collect();
    builds.sort();

    builds.pop().ok_or_else(|| {
        io_error(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no index build found",
        ))
    })
}

/// Whether `name` was produced by [`crate::config::BUILD_DIR_FORMAT`]: 14
/// digits, a dot, then 3 digits.
fn is_build_dir_name(name: &str) -> bool {
    name.split_once('.').is_some_and(|(secs, millis)| {
        secs.len() == 14
            && millis.len() == 3
            && secs.bytes().chain(millis.bytes()).all(|b| b.is_ascii_digit())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dim_core::{ContainerConfig, ImageConfig, ImageDescriptor};

    const HEAP: usize = 15_000_000;

    fn image(repository: &str, tag: &str, config: ContainerConfig) -> IndexedImage {
        let config = ImageConfig {
            author: "ops team".to_string(),
            comment: "Installing packages".to_string(),
            config,
            ..ImageConfig::default()
        };
        IndexedImage::parse(
            repository,
            &ImageDescriptor::new(format!("sha256:{repository}{tag}"), tag, config),
        )
    }

    fn add(index: &TantivyIndex, image: &IndexedImage) {
        index.index(&image.full_name, image).unwrap();
    }

    fn count(index: &TantivyIndex, query: ImageQuery) -> u64 {
        index
            .search(&SearchRequest::new(query).with_size(0))
            .unwrap()
            .total
    }

    #[test]
    fn test_index_is_visible_immediately() {
        let index = TantivyIndex::create_in_ram(HEAP).unwrap();
        add(&index, &image("a/b", "latest", ContainerConfig::default()));
        assert_eq!(index.num_docs(), 1);
        assert_eq!(count(&index, ImageQuery::MatchAll), 1);
    }

    #[test]
    fn test_staged_documents_wait_for_flush() {
        let index = TantivyIndex::create_in_ram(HEAP).unwrap();
        let first = image("a/b", "1.0", ContainerConfig::default());
        let second = image("a/b", "2.0", ContainerConfig::default());
        index.stage(&first.full_name, &first).unwrap();
        index.stage(&second.full_name, &second).unwrap();
        index.stage(&first.full_name, &first).unwrap();
        assert_eq!(count(&index, ImageQuery::MatchAll), 0);

        index.flush().unwrap();
        assert_eq!(count(&index, ImageQuery::MatchAll), 2);
    }

    #[test]
    fn test_reindex_replaces_document() {
        let index = TantivyIndex::create_in_ram(HEAP).unwrap();
        let first = image("a/b", "latest", ContainerConfig::default().with_label("os=ubuntu"));
        let second = image("a/b", "latest", ContainerConfig::default().with_label("os=alpine"));
        add(&index, &first);
        add(&index, &second);

        assert_eq!(count(&index, ImageQuery::MatchAll), 1);
        assert_eq!(count(&index, ImageQuery::QueryString("Label.os:alpine".into())), 1);
        assert_eq!(count(&index, ImageQuery::QueryString("Label.os:ubuntu".into())), 0);
    }

    #[test]
    fn test_delete() {
        let index = TantivyIndex::create_in_ram(HEAP).unwrap();
        let doc = image("a/b", "1.0", ContainerConfig::default());
        add(&index, &doc);
        index.delete("a/b:1.0").unwrap();
        assert_eq!(count(&index, ImageQuery::MatchAll), 0);
        index.delete("missing:1.0").unwrap();
    }

    #[test]
    fn test_tag_is_exact() {
        let index = TantivyIndex::create_in_ram(HEAP).unwrap();
        add(&index, &image("a/b", "1.0-alpine", ContainerConfig::default()));
        assert_eq!(count(&index, ImageQuery::term("Tag", "1.0-alpine")), 1);
        assert_eq!(count(&index, ImageQuery::term("Tag", "alpine")), 0);
    }

    #[test]
    fn test_fuzzy_name() {
        let index = TantivyIndex::create_in_ram(HEAP).unwrap();
        add(&index, &image("library/nginx", "latest", ContainerConfig::default()));
        let query = ImageQuery::Fuzzy {
            field: "Name".to_string(),
            term: "ngnix".to_string(),
            distance: 1,
        };
        assert_eq!(count(&index, query), 1);
    }

    #[test]
    fn test_id_lookup_and_not_stored() {
        let index = TantivyIndex::create_in_ram(HEAP).unwrap();
        let doc = image("a/b", "latest", ContainerConfig::default());
        add(&index, &doc);

        let result = index
            .search(&SearchRequest::new(ImageQuery::term("ID", &doc.id)).with_fields(["ID", "FullName"]))
            .unwrap();
        assert_eq!(result.total, 1);
        assert!(result.hits[0].field("ID").is_none());
        assert_eq!(result.hits[0].text("FullName"), Some("a/b:latest"));
    }

    #[test]
    fn test_default_scope_query() {
        let index = TantivyIndex::create_in_ram(HEAP).unwrap();
        add(&index, &image("a/b", "latest", ContainerConfig::default()));
        assert_eq!(count(&index, ImageQuery::QueryString("packages".into())), 1);
        assert_eq!(count(&index, ImageQuery::QueryString("install".into())), 1);
    }

    #[test]
    fn test_invalid_query_string() {
        let index = TantivyIndex::create_in_ram(HEAP).unwrap();
        let err = index
            .search(&SearchRequest::new(ImageQuery::QueryString("Bogus:x".into())))
            .unwrap_err();
        assert!(matches!(err, IndexError::Query { .. }));
    }

    #[test]
    fn test_projection_shapes() {
        let index = TantivyIndex::create_in_ram(HEAP).unwrap();
        let config = ContainerConfig::default()
            .with_label("os=ubuntu")
            .with_label("version=xenial")
            .with_env("PATH=/bin")
            .with_exposed_port("80/tcp");
        add(&index, &image("a/b", "latest", config));

        let request = SearchRequest::new(ImageQuery::MatchAll).with_fields([
            "Labels",
            "Envs",
            "Label.os",
            "Env.PATH",
            "ExposedPorts",
            "Created",
        ]);
        let hit = &index.search(&request).unwrap().hits[0];

        assert_eq!(
            hit.field("Labels"),
            Some(&FieldValue::Collection(vec!["os".to_string(), "version".to_string()]))
        );
        assert_eq!(hit.field("Envs"), Some(&FieldValue::Scalar("PATH".to_string())));
        assert_eq!(hit.text("Label.os"), Some("ubuntu"));
        assert_eq!(hit.text("Env.PATH"), Some("/bin"));
        assert_eq!(hit.text("ExposedPorts"), Some("80"));
        assert!(hit.field("Created").is_none());
    }

    #[test]
    fn test_unknown_projection_field_is_skipped() {
        let index = TantivyIndex::create_in_ram(HEAP).unwrap();
        add(&index, &image("a/b", "latest", ContainerConfig::default()));
        let result = index
            .search(&SearchRequest::new(ImageQuery::MatchAll).with_fields(["Bogus", "Created", "Tag"]))
            .unwrap();

        let hit = &result.hits[0];
        assert_eq!(hit.text("Tag"), Some("latest"));
        assert!(hit.field("Bogus").is_none());
        assert!(hit.field("Created").is_none());
    }

    #[test]
    fn test_empty_label_and_env_keys_are_projected() {
        let index = TantivyIndex::create_in_ram(HEAP).unwrap();
        let config = ContainerConfig::default()
            .with_label("=x")
            .with_label("os=ubuntu")
            .with_env("=y");
        add(&index, &image("a/b", "latest", config));

        let request = SearchRequest::new(ImageQuery::MatchAll).with_fields(["Label.", "Label.os", "Env."]);
        let hit = &index.search(&request).unwrap().hits[0];
        assert_eq!(hit.text("Label."), Some("x"));
        assert_eq!(hit.text("Label.os"), Some("ubuntu"));
        assert_eq!(hit.text("Env."), Some("y"));
    }

    #[test]
    fn test_pagination() {
        let index = TantivyIndex::create_in_ram(HEAP).unwrap();
        for tag in ["1", "2", "3"] {
            add(&index, &image("a/b", tag, ContainerConfig::default()));
        }
        let result = index
            .search(&SearchRequest::new(ImageQuery::MatchAll).with_size(2).with_from(2))
            .unwrap();
        assert_eq!(result.total, 3);
        assert_eq!(result.hits.len(), 1);
    }

    #[test]
    fn test_empty_disjunction_matches_nothing() {
        let index = TantivyIndex::create_in_ram(HEAP).unwrap();
        add(&index, &image("a/b", "latest", ContainerConfig::default()));
        assert_eq!(count(&index, ImageQuery::Should(Vec::new())), 0);
    }

    #[test]
    fn test_closed_index_rejects_writes() {
        let index = TantivyIndex::create_in_ram(HEAP).unwrap();
        add(&index, &image("a/b", "latest", ContainerConfig::default()));
        index.close().unwrap();
        index.close().unwrap();

        let err = index
            .index("a/c:latest", &image("a/c", "latest", ContainerConfig::default()))
            .unwrap_err();
        assert!(matches!(err, IndexError::Closed));
        assert_eq!(count(&index, ImageQuery::MatchAll), 1);
    }

    #[test]
    fn test_reopen_latest_build() {
        let root = tempfile::tempdir().unwrap();
        let older = root.path().join("20240101000000.000");
        let newer = root.path().join("20240102000000.000");

        let index = TantivyIndex::create_in_dir(&older, HEAP).unwrap();
        index.close().unwrap();
        let index = TantivyIndex::create_in_dir(&newer, HEAP).unwrap();
        add(&index, &image("a/b", "latest", ContainerConfig::default()));
        index.close().unwrap();
        std::fs::create_dir(root.path().join("scratch")).unwrap();

        let reopened = TantivyIndex::open_latest(root.path()).unwrap();
        assert_eq!(reopened.num_docs(), 1);
        assert!(matches!(
            reopened.delete("a/b:latest"),
            Err(IndexError::Closed)
        ));
    }

    #[test]
    fn test_reopen_latest_build_for_writing() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("20240101000000.000");
        let index = TantivyIndex::create_in_dir(&dir, HEAP).unwrap();
        add(&index, &image("a/b", "latest", ContainerConfig::default()));
        add(&index, &image("a/c", "latest", ContainerConfig::default()));
        index.close().unwrap();
        drop(index);

        let reopened = TantivyIndex::open_latest_writable(root.path(), HEAP).unwrap();
        reopened.delete("a/b:latest").unwrap();
        assert_eq!(reopened.num_docs(), 1);
        reopened.close().unwrap();
        drop(reopened);

        assert_eq!(TantivyIndex::open(&dir).unwrap().num_docs(), 1);
    }

    #[test]
    fn test_open_latest_without_builds() {
        let root = tempfile::tempdir().unwrap();
        assert!(matches!(
            TantivyIndex::open_latest(root.path()),
            Err(IndexError::Io { .. })
        ));
    }

    #[test]
    fn test_build_dir_names() {
        assert!(is_build_dir_name("20240131093015.042"));
        assert!(!is_build_dir_name("2024013109301.042"));
        assert!(!is_build_dir_name("scratch"));
        assert!(!is_build_dir_name("20240131093015"));
    }
}
