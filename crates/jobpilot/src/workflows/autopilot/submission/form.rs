use serde::{Deserialize, Serialize};

/// Closed set of recognized application portals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormType {
    Workday,
    Greenhouse,
    Lever,
    Jobvite,
    Taleo,
    Icims,
    SmartRecruiters,
    BambooHr,
    LinkedInEasyApply,
    IndeedApply,
    MultiStepWizard,
    SimpleForm,
    EmailApplication,
    CustomPortal,
}

/// Individual form-filling step the executor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStep {
    BasicInfo,
    ContactDetails,
    Experience,
    Education,
    Skills,
    CoverLetter,
    ResumeUpload,
    PortfolioLinks,
    Availability,
    SalaryExpectations,
    AdditionalQuestions,
    LegalAgreements,
    PreviewSubmit,
}

impl ApplicationStep {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStep::BasicInfo => "basic_info",
            ApplicationStep::ContactDetails => "contact_details",
            ApplicationStep::Experience => "experience",
            ApplicationStep::Education => "education",
            ApplicationStep::Skills => "skills",
            ApplicationStep::CoverLetter => "cover_letter",
            ApplicationStep::ResumeUpload => "resume_upload",
            ApplicationStep::PortfolioLinks => "portfolio_links",
            ApplicationStep::Availability => "availability",
            ApplicationStep::SalaryExpectations => "salary_expectations",
            ApplicationStep::AdditionalQuestions => "additional_questions",
            ApplicationStep::LegalAgreements => "legal_agreements",
            ApplicationStep::PreviewSubmit => "preview_submit",
        }
    }
}

impl FormType {
    pub const fn label(self) -> &'static str {
        match self {
            FormType::Workday => "workday",
            FormType::Greenhouse => "greenhouse",
            FormType::Lever => "lever",
            FormType::Jobvite => "jobvite",
            FormType::Taleo => "taleo",
            FormType::Icims => "icims",
            FormType::SmartRecruiters => "smartrecruiters",
            FormType::BambooHr => "bamboo_hr",
            FormType::LinkedInEasyApply => "linkedin_easy_apply",
            FormType::IndeedApply => "indeed_apply",
            FormType::MultiStepWizard => "multi_step_wizard",
            FormType::SimpleForm => "simple_form",
            FormType::EmailApplication => "email_application",
            FormType::CustomPortal => "custom_portal",
        }
    }

    /// Ordered step plan for this portal.
    pub const fn steps(self) -> &'static [ApplicationStep] {
        use ApplicationStep::*;
        match self {
            FormType::Workday => &[
                BasicInfo,
                ContactDetails,
                ResumeUpload,
                AdditionalQuestions,
                PreviewSubmit,
            ],
            FormType::Greenhouse => &[BasicInfo, ResumeUpload, AdditionalQuestions, PreviewSubmit],
            FormType::Lever => &[BasicInfo, ResumeUpload, PortfolioLinks, PreviewSubmit],
            FormType::LinkedInEasyApply => &[BasicInfo],
            FormType::IndeedApply => &[BasicInfo, CoverLetter],
            FormType::MultiStepWizard => &[
                BasicInfo,
                ContactDetails,
                Experience,
                Education,
                Skills,
                ResumeUpload,
                PreviewSubmit,
            ],
            FormType::EmailApplication => &[CoverLetter, ResumeUpload],
            FormType::Jobvite
            | FormType::Taleo
            | FormType::Icims
            | FormType::SmartRecruiters
            | FormType::BambooHr
            | FormType::SimpleForm
            | FormType::CustomPortal => &[BasicInfo, ResumeUpload, PreviewSubmit],
        }
    }
}

/// Classify a posting's application surface from its URL and, when available,
/// the fetched page content. URL signatures win; unknown surfaces fall back
/// to the conservative custom-portal plan.
pub fn detect_form_type(apply_url: &str, page_content: Option<&str>) -> FormType {
    let url = apply_url.to_ascii_lowercase();

    if url.starts_with("mailto:") {
        return FormType::EmailApplication;
    }

    let by_url = [
        ("myworkday", FormType::Workday),
        ("workday", FormType::Workday),
        ("boards.greenhouse.io", FormType::Greenhouse),
        ("greenhouse", FormType::Greenhouse),
        ("lever.co", FormType::Lever),
        ("jobvite", FormType::Jobvite),
        ("taleo", FormType::Taleo),
        ("icims.com", FormType::Icims),
        ("smartrecruiters", FormType::SmartRecruiters),
        ("bamboohr", FormType::BambooHr),
        ("linkedin.com", FormType::LinkedInEasyApply),
        ("indeed.com", FormType::IndeedApply),
    ];
    for (needle, form_type) in by_url {
        if url.contains(needle) {
            return form_type;
        }
    }

    if let Some(content) = page_content {
        let content = content.to_ascii_lowercase();
        if content.contains("workday") && content.contains("application") {
            return FormType::Workday;
        }
        if content.contains("greenhouse") {
            return FormType::Greenhouse;
        }
        if content.contains("lever-application") || content.contains("data-automation") {
            return FormType::Lever;
        }
        if (content.contains("step") && content.contains(" of ")) || content.contains("wizard") {
            return FormType::MultiStepWizard;
        }
    }

    FormType::CustomPortal
}
