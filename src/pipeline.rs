use crate::errors::Result;
use crate::extract::{SourceExtractor, SourceKind};
use crate::grading::{split_rubric, GradeReport, GradingService};
use crate::retrieval::{IndexOutcome, RetrievalService};

/// Everything produced by a completed assessment.
#[derive(Debug, Clone)]
pub struct Assessment {
    pub grade: GradeReport,
    pub feedback: String,
    /// The course materials the grade and feedback were based on.
    pub materials: Vec<String>,
}

/// Result of [`Assistant::assess`]. Extraction failures on either source
/// are recoverable and reported back instead of aborting the request.
#[derive(Debug, Clone)]
pub enum AssessmentOutcome {
    Graded(Assessment),
    SourceFailed { source: String, kind: SourceKind },
}

/// Top-level composition of extractor, retrieval and grading. All
/// collaborators are constructed once at process start and injected here;
/// there are no module-scope singletons.
pub struct Assistant {
    extractor: SourceExtractor,
    retrieval: RetrievalService,
    grading: GradingService,
}

impl Assistant {
    pub fn new(
        extractor: SourceExtractor,
        retrieval: RetrievalService,
        grading: GradingService,
    ) -> Self {
        Self {
            extractor,
            retrieval,
            grading,
        }
    }

    pub fn retrieval(&self) -> &RetrievalService {
        &self.retrieval
    }

    /// Extracts a source and indexes it under the given prompt. Extraction
    /// failures come back as [`IndexOutcome::Skipped`] so the caller can
    /// report them.
    pub async fn ingest(&self, link: &str, prompt: &str) -> Result<IndexOutcome> {
        let record = self.extractor.extract(link).await?;
        self.retrieval.index_material(&record, prompt).await
    }

    /// Full grading workflow: extract question and answer, split out the
    /// rubric, retrieve relevant materials, grade and produce feedback.
    pub async fn assess(
        &self,
        question_source: &str,
        answer_source: &str,
    ) -> Result<AssessmentOutcome> {
        let question = self.extractor.extract(question_source).await?;
        if question.kind.is_error() {
            return Ok(AssessmentOutcome::SourceFailed {
                source: question_source.to_string(),
                kind: question.kind,
            });
        }
        let answer = self.extractor.extract(answer_source).await?;
        if answer.kind.is_error() {
            return Ok(AssessmentOutcome::SourceFailed {
                source: answer_source.to_string(),
                kind: answer.kind,
            });
        }

        let (question_text, rubric) = split_rubric(&question.content);
        let materials = self.retrieval.retrieve_default(question_text).await?;
        let grade = self
            .grading
            .grade(question_text, rubric, &answer.content, &materials)
            .await?;
        let feedback = self
            .grading
            .feedback(question_text, &answer.content, &materials)
            .await?;

        Ok(AssessmentOutcome::Graded(Assessment {
            grade,
            feedback,
            materials,
        }))
    }
}
