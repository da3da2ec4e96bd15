pub mod prediction_response;
pub mod seeded_output;
