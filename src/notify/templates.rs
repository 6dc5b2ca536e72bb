//! The two fixed notification templates

use crate::types::PipelineOutcome;

const SIGNATURE: &str = "Automatically Sent by Assignment Submission System";

/// Subject line for `outcome`
pub fn subject(outcome: PipelineOutcome, assignment_name: &str) -> String {
    match outcome {
        PipelineOutcome::Succeeded => {
            format!("Assignment Submission Confirmation: {}", assignment_name)
        }
        PipelineOutcome::Failed => "Action Required: Assignment Submission Failed".to_string(),
    }
}

/// Plain-text body for `outcome`
pub fn body(
    outcome: PipelineOutcome,
    recipient: &str,
    submission_url: &str,
    assignment_name: &str,
) -> String {
    match outcome {
        PipelineOutcome::Succeeded => format!(
            "Dear {recipient},\n\n\
             We are pleased to inform you that your assignment titled {assignment_name} \
             has been successfully submitted: {submission_url}\n\n\
             Thank you for completing the work on time. Your dedication is essential to \
             the progression of our course.\n\n\
             Should you have any questions or require further assistance, please do not \
             hesitate to reach out.\n\n\
             Wishing you continued success in your studies!\n\n\n\
             Warm regards,\n\
             {SIGNATURE}"
        ),
        PipelineOutcome::Failed => format!(
            "Dear {recipient},\n\n\
             It appears that there was an issue with your recent attempt to submit the \
             assignment {assignment_name}. Unfortunately, we did not receive your \
             submission successfully. The URL you provided for your submission is: \
             {submission_url}.\n\n\
             Please review the submission link or file for any errors and attempt to \
             submit again. If the problem persists, do not hesitate to contact us for \
             support.\n\n\
             We understand that technical issues can be frustrating and appreciate your \
             patience in resolving this matter.\n\n\
             Best regards,\n\
             {SIGNATURE}"
        ),
    }
}
