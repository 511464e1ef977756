//! Program assembly: one program plus its courses, their modules, the final
//! quiz and the partition's images, composed into a single document.

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::api::format::encode_binary;
use crate::config::AssemblerConfig;
use crate::database::manager::DatabaseError;
use crate::database::models::{Course, FinalQuiz, Image, Module, Program};
use crate::database::partitions::{Partition, Partitions};
use crate::types::{Collection, Language, UnknownLanguage};

/// What to do with references that resolve to nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DanglingReferencePolicy {
    /// Missing courses and modules are omitted, a missing final quiz becomes null
    #[default]
    Tolerate,
    /// Any unresolved reference fails the assembly
    Reject,
}

impl fmt::Display for DanglingReferencePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DanglingReferencePolicy::Tolerate => f.write_str("tolerate"),
            DanglingReferencePolicy::Reject => f.write_str("reject"),
        }
    }
}

impl FromStr for DanglingReferencePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tolerate" => Ok(DanglingReferencePolicy::Tolerate),
            "reject" => Ok(DanglingReferencePolicy::Reject),
            other => Err(format!("unknown dangling reference policy: {}", other)),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    #[error(transparent)]
    InvalidLanguage(#[from] UnknownLanguage),
    #[error("Program not found: {0}")]
    NotFound(String),
    #[error("Unresolved {collection} reference: {uid}")]
    DanglingReference { collection: Collection, uid: String },
    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),
    #[error("Assembly exceeded {0:?}")]
    Timeout(Duration),
}

impl AssemblyError {
    /// Faults of the system rather than of the request
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            AssemblyError::DanglingReference { .. }
                | AssemblyError::Storage(_)
                | AssemblyError::Timeout(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssembledProgram {
    pub program_id: String,
    pub title: Option<String>,
    pub courses: Vec<AssembledCourse>,
    pub final_quiz: Option<FinalQuiz>,
    pub metadata: Map<String, Value>,
    pub images: Vec<EncodedImage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssembledCourse {
    #[serde(flatten)]
    pub course: Course,
    pub modules: Vec<Module>,
}

/// Image fields with the payload replaced by its base64 text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodedImage {
    #[serde(flatten)]
    pub image: Image,
    #[serde(rename = "coverImage")]
    pub cover_image: Option<String>,
}

impl From<Image> for EncodedImage {
    fn from(mut image: Image) -> Self {
        let cover_image = image.payload.take().map(|bytes| encode_binary(&bytes));
        Self { image, cover_image }
    }
}

pub struct ProgramAssembler {
    partitions: Arc<Partitions>,
    timeout: Duration,
    policy: DanglingReferencePolicy,
}

impl ProgramAssembler {
    pub fn new(
        partitions: Arc<Partitions>,
        timeout: Duration,
        policy: DanglingReferencePolicy,
    ) -> Self {
        Self { partitions, timeout, policy }
    }

    pub fn from_config(partitions: Arc<Partitions>, config: &AssemblerConfig) -> Self {
        Self::new(
            partitions,
            Duration::from_millis(config.timeout_ms),
            config.dangling_references,
        )
    }

    /// Assemble `program_id` from the partition named by `language_code`.
    ///
    /// The language is validated before any storage access. Storage faults
    /// abort the whole assembly; nothing partial is returned.
    pub async fn assemble(
        &self,
        language_code: &str,
        program_id: &str,
    ) -> Result<AssembledProgram, AssemblyError> {
        let language: Language = language_code.parse()?;
        if program_id.is_empty() {
            return Err(AssemblyError::NotFound(String::new()));
        }

        let partition = self.partitions.get(language);
        match tokio::time::timeout(self.timeout, self.assemble_in(partition, program_id)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    "Assembly of program {} ({}) timed out after {:?}",
                    program_id,
                    language,
                    self.timeout
                );
                Err(AssemblyError::Timeout(self.timeout))
            }
        }
    }

    async fn assemble_in(
        &self,
        partition: &Partition,
        program_id: &str,
    ) -> Result<AssembledProgram, AssemblyError> {
        let program = partition
            .programs
            .select_one(program_id)
            .await?
            .ok_or_else(|| AssemblyError::NotFound(program_id.to_string()))?;

        let (courses, final_quiz, images) = tokio::try_join!(
            self.load_courses(partition, &program),
            self.load_final_quiz(partition, &program),
            self.load_images(partition),
        )?;

        tracing::debug!(
            "Assembled program {} ({}): {} courses, {} images",
            program.uid,
            partition.language(),
            courses.len(),
            images.len()
        );

        Ok(AssembledProgram {
            program_id: program.uid,
            title: program.title,
            courses,
            final_quiz,
            metadata: program.metadata.unwrap_or_default(),
            images,
        })
    }

    async fn load_courses(
        &self,
        partition: &Partition,
        program: &Program,
    ) -> Result<Vec<AssembledCourse>, AssemblyError> {
        let course_uids = program.course_uids();
        let courses = partition.courses.select_ids(&course_uids).await?;
        let found = courses.iter().map(|c| c.uid.as_str());
        self.check_resolved(Collection::Courses, &course_uids, found)?;

        try_join_all(courses.into_iter().map(|course| self.load_modules(partition, course))).await
    }

    async fn load_modules(
        &self,
        partition: &Partition,
        mut course: Course,
    ) -> Result<AssembledCourse, AssemblyError> {
        let module_uids = course.module_uids();
        let modules = partition.modules.select_ids(&module_uids).await?;
        let found = modules.iter().map(|m| m.uid.as_str());
        self.check_resolved(Collection::Modules, &module_uids, found)?;

        course.extra.remove("modules");
        Ok(AssembledCourse { course, modules })
    }

    async fn load_final_quiz(
        &self,
        partition: &Partition,
        program: &Program,
    ) -> Result<Option<FinalQuiz>, AssemblyError> {
        let Some(uid) = program.final_quiz_uid() else {
            return Ok(None);
        };

        let quiz = partition.final_quizzes.select_one(uid).await?;
        if quiz.is_none() && self.policy == DanglingReferencePolicy::Reject {
            return Err(AssemblyError::DanglingReference {
                collection: Collection::FinalQuiz,
                uid: uid.to_string(),
            });
        }
        Ok(quiz)
    }

    async fn load_images(&self, partition: &Partition) -> Result<Vec<EncodedImage>, AssemblyError> {
        let images = partition.images.select_all().await?;
        Ok(images.into_iter().map(EncodedImage::from).collect())
    }

    fn check_resolved<'a>(
        &self,
        collection: Collection,
        requested: &[String],
        found: impl Iterator<Item = &'a str>,
    ) -> Result<(), AssemblyError> {
        if self.policy == DanglingReferencePolicy::Tolerate {
            return Ok(());
        }

        let found: HashSet<&str> = found.collect();
        match requested.iter().find(|uid| !found.contains(uid.as_str())) {
            Some(uid) => Err(AssemblyError::DanglingReference {
                collection,
                uid: uid.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::format::decode_binary;
    use crate::database::memory::MemoryDocumentStore;
    use crate::database::store::DocumentStore;
    use crate::testing::{doc, CountingStore, FailingStore, SlowStore};
    use serde_json::json;

    const TIMEOUT: Duration = Duration::from_secs(5);

    async fn seeded_memory() -> MemoryDocumentStore {
        let store = MemoryDocumentStore::new();
        store
            .seed(
                Collection::Programs,
                vec![doc(json!({
                    "uid": "p1",
                    "title": "Intro",
                    "courses_ids": { "a": "c1" },
                    "final_quiz_id": "q1"
                }))],
            )
            .await
            .unwrap();
        store
            .seed(Collection::Courses, vec![doc(json!({ "uid": "c1", "module_ids": { "a": "m1" } }))])
            .await
            .unwrap();
        store
            .seed(Collection::Modules, vec![doc(json!({ "uid": "m1", "title": "M1" }))])
            .await
            .unwrap();
        store
            .seed(Collection::FinalQuiz, vec![doc(json!({ "uid": "q1" }))])
            .await
            .unwrap();
        store
    }

    fn assembler_over(
        store: Arc<dyn DocumentStore>,
        policy: DanglingReferencePolicy,
    ) -> ProgramAssembler {
        let partitions = Partitions::from_stores(|language| match language {
            Language::En => store.clone(),
            _ => Arc::new(MemoryDocumentStore::new()),
        });
        ProgramAssembler::new(Arc::new(partitions), TIMEOUT, policy)
    }

    fn tolerant(store: Arc<dyn DocumentStore>) -> ProgramAssembler {
        assembler_over(store, DanglingReferencePolicy::Tolerate)
    }

    #[tokio::test]
    async fn assembles_end_to_end() {
        let assembler = tolerant(Arc::new(seeded_memory().await));

        let program = assembler.assemble("en", "p1").await.unwrap();
        let value = serde_json::to_value(&program).unwrap();

        assert_eq!(
            value,
            json!({
                "program_id": "p1",
                "title": "Intro",
                "courses": [{
                    "uid": "c1",
                    "module_ids": { "a": "m1" },
                    "modules": [{ "uid": "m1", "title": "M1" }]
                }],
                "final_quiz": { "uid": "q1" },
                "metadata": {},
                "images": []
            })
        );
    }

    #[tokio::test]
    async fn language_codes_are_case_insensitive() {
        let assembler = tolerant(Arc::new(seeded_memory().await));
        let program = assembler.assemble("EN", "p1").await.unwrap();
        assert_eq!(program.program_id, "p1");
    }

    #[tokio::test]
    async fn duplicate_course_references_resolve_once() {
        let store = seeded_memory().await;
        store
            .seed(
                Collection::Programs,
                vec![doc(json!({ "uid": "p2", "courses_ids": { "a": "c1", "b": "c1", "c": "c2" } }))],
            )
            .await
            .unwrap();
        store
            .seed(Collection::Courses, vec![doc(json!({ "uid": "c2", "title": "Second" }))])
            .await
            .unwrap();
        let assembler = tolerant(Arc::new(store));

        let program = assembler.assemble("en", "p2").await.unwrap();
        let mut uids: Vec<&str> = program.courses.iter().map(|c| c.course.uid.as_str()).collect();
        uids.sort();
        assert_eq!(uids, vec!["c1", "c2"]);
        assert_eq!(program.title, None);
    }

    #[tokio::test]
    async fn dangling_references_are_absorbed() {
        let store = seeded_memory().await;
        store
            .seed(
                Collection::Programs,
                vec![doc(json!({
                    "uid": "p3",
                    "courses_ids": { "a": "c1", "b": "missing-course" },
                    "final_quiz_id": "missing-quiz"
                }))],
            )
            .await
            .unwrap();
        store
            .seed(
                Collection::Courses,
                vec![doc(json!({ "uid": "c1", "module_ids": { "a": "missing-module" } }))],
            )
            .await
            .unwrap();
        let assembler = tolerant(Arc::new(store));

        let program = assembler.assemble("en", "p3").await.unwrap();
        assert_eq!(program.courses.len(), 1);
        assert_eq!(program.courses[0].course.uid, "c1");
        assert!(program.courses[0].modules.is_empty());
        assert_eq!(program.final_quiz, None);
    }

    #[tokio::test]
    async fn absent_and_empty_final_quiz_are_null() {
        let store = seeded_memory().await;
        store
            .seed(
                Collection::Programs,
                vec![
                    doc(json!({ "uid": "no-quiz" })),
                    doc(json!({ "uid": "empty-quiz", "final_quiz_id": "" })),
                ],
            )
            .await
            .unwrap();
        let counting = Arc::new(CountingStore::new(Arc::new(store)));
        let assembler = tolerant(counting.clone());

        for uid in ["no-quiz", "empty-quiz"] {
            let program = assembler.assemble("en", uid).await.unwrap();
            let value = serde_json::to_value(&program).unwrap();
            assert_eq!(value["final_quiz"], Value::Null);
            assert_eq!(value["courses"], json!([]));
        }
        assert_eq!(counting.calls_to(Collection::FinalQuiz), 0);
        assert_eq!(counting.calls_to(Collection::Courses), 0);
    }

    #[tokio::test]
    async fn every_partition_image_is_included_and_encoded() {
        let store = seeded_memory().await;
        let bytes = vec![137u8, 80, 78, 71, 0, 255];
        store
            .seed(
                Collection::Images,
                vec![
                    doc(json!({ "uid": "img-1", "filename": "a.png", "content_type": "image/png" }))
                        .with_binary(Some(bytes.clone())),
                    doc(json!({ "uid": "img-2", "filename": "unrelated.jpg" })).with_binary(Some(vec![])),
                    doc(json!({ "uid": "img-3" })),
                ],
            )
            .await
            .unwrap();
        let assembler = tolerant(Arc::new(store));

        let program = assembler.assemble("en", "p1").await.unwrap();
        let value = serde_json::to_value(&program).unwrap();
        let images = value["images"].as_array().unwrap();
        assert_eq!(images.len(), 3);

        assert_eq!(images[0]["filename"], "a.png");
        assert_eq!(images[0]["content_type"], "image/png");
        let encoded = images[0]["coverImage"].as_str().unwrap();
        assert_eq!(decode_binary(encoded).unwrap(), bytes);

        assert_eq!(images[1]["coverImage"], "");
        assert_eq!(images[2]["coverImage"], Value::Null);
    }

    #[tokio::test]
    async fn metadata_is_carried_over() {
        let store = seeded_memory().await;
        store
            .seed(
                Collection::Programs,
                vec![doc(json!({ "uid": "p4", "metadata": { "level": "beginner" } }))],
            )
            .await
            .unwrap();
        let assembler = tolerant(Arc::new(store));

        let program = assembler.assemble("en", "p4").await.unwrap();
        assert_eq!(program.metadata.get("level"), Some(&json!("beginner")));
    }

    #[tokio::test]
    async fn invalid_language_touches_no_storage() {
        let counting = Arc::new(CountingStore::new(Arc::new(seeded_memory().await)));
        let assembler = tolerant(counting.clone());

        let err = assembler.assemble("xx", "p1").await.unwrap_err();
        assert!(matches!(err, AssemblyError::InvalidLanguage(_)));
        assert!(!err.is_server_error());
        assert_eq!(counting.call_count(), 0);
    }

    #[tokio::test]
    async fn missing_program_only_looks_up_the_program() {
        let counting = Arc::new(CountingStore::new(Arc::new(seeded_memory().await)));
        let assembler = tolerant(counting.clone());

        let err = assembler.assemble("en", "prog-does-not-exist").await.unwrap_err();
        assert!(matches!(err, AssemblyError::NotFound(ref uid) if uid == "prog-does-not-exist"));
        assert_eq!(counting.calls(), vec![(Collection::Programs, "find_one")]);
    }

    #[tokio::test]
    async fn empty_program_id_is_not_found_without_storage() {
        let counting = Arc::new(CountingStore::new(Arc::new(seeded_memory().await)));
        let assembler = tolerant(counting.clone());

        let err = assembler.assemble("en", "").await.unwrap_err();
        assert!(matches!(err, AssemblyError::NotFound(_)));
        assert_eq!(counting.call_count(), 0);
    }

    #[tokio::test]
    async fn module_fetches_fan_out_per_course() {
        let store = seeded_memory().await;
        store
            .seed(
                Collection::Programs,
                vec![doc(json!({ "uid": "p5", "courses_ids": { "a": "c1", "b": "c2", "c": "c3" } }))],
            )
            .await
            .unwrap();
        store
            .seed(
                Collection::Courses,
                vec![
                    doc(json!({ "uid": "c2", "module_ids": { "x": "m1" } })),
                    doc(json!({ "uid": "c3" })),
                ],
            )
            .await
            .unwrap();
        let counting = Arc::new(CountingStore::new(Arc::new(store)));
        let assembler = tolerant(counting.clone());

        let program = assembler.assemble("en", "p5").await.unwrap();
        assert_eq!(program.courses.len(), 3);
        // one set-membership query for courses; c3 has no module refs so no query
        assert_eq!(counting.calls_to(Collection::Courses), 1);
        assert_eq!(counting.calls_to(Collection::Modules), 2);
    }

    #[tokio::test]
    async fn storage_failure_is_a_server_error() {
        let store = FailingStore::new(seeded_memory().await, Collection::Modules);
        let assembler = tolerant(Arc::new(store));

        let err = assembler.assemble("en", "p1").await.unwrap_err();
        assert!(matches!(err, AssemblyError::Storage(_)));
        assert!(err.is_server_error());
    }

    #[tokio::test]
    async fn slow_storage_times_out() {
        let store = SlowStore::new(seeded_memory().await, Collection::Images, Duration::from_secs(10));
        let store: Arc<dyn DocumentStore> = Arc::new(store);
        let partitions = Partitions::from_stores(|_| store.clone());
        let assembler = ProgramAssembler::new(
            Arc::new(partitions),
            Duration::from_millis(50),
            DanglingReferencePolicy::Tolerate,
        );

        let err = assembler.assemble("am", "p1").await.unwrap_err();
        assert!(matches!(err, AssemblyError::Timeout(_)));
        assert!(err.is_server_error());
    }

    #[tokio::test]
    async fn reject_policy_surfaces_dangling_references() {
        let store = seeded_memory().await;
        store
            .seed(
                Collection::Programs,
                vec![
                    doc(json!({ "uid": "bad-course", "courses_ids": { "a": "c1", "b": "ghost" } })),
                    doc(json!({ "uid": "bad-quiz", "final_quiz_id": "ghost-quiz" })),
                ],
            )
            .await
            .unwrap();
        let assembler = assembler_over(Arc::new(store), DanglingReferencePolicy::Reject);

        assembler.assemble("en", "p1").await.unwrap();

        match assembler.assemble("en", "bad-course").await.unwrap_err() {
            AssemblyError::DanglingReference { collection, uid } => {
                assert_eq!(collection, Collection::Courses);
                assert_eq!(uid, "ghost");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        match assembler.assemble("en", "bad-quiz").await.unwrap_err() {
            AssemblyError::DanglingReference { collection, .. } => assert_eq!(collection, Collection::FinalQuiz),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn policy_parses_from_config_values() {
        assert_eq!("tolerate".parse::<DanglingReferencePolicy>(), Ok(DanglingReferencePolicy::Tolerate));
        assert_eq!("REJECT".parse::<DanglingReferencePolicy>(), Ok(DanglingReferencePolicy::Reject));
        assert!("ignore".parse::<DanglingReferencePolicy>().is_err());
        assert_eq!(DanglingReferencePolicy::default(), DanglingReferencePolicy::Tolerate);
    }
}
