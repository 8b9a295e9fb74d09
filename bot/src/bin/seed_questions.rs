//! Seeds the local trivia bank with a starter question set. Idempotent:
//! an already-populated bank is left untouched.

use tracing_subscriber::fmt::init;

use bluequiz::config::Config;
use bluequiz::store::Database;

const SAMPLE_QUESTIONS: &[(&str, &str, &str)] = &[
    // Geography
    ("What is the capital of France?", "Paris", "Geography"),
    ("Which is the largest ocean on Earth?", "Pacific Ocean", "Geography"),
    ("What is the smallest country in the world?", "Vatican City", "Geography"),
    ("What is the capital of Japan?", "Tokyo", "Geography"),
    ("Which desert is the largest in the world?", "Sahara Desert", "Geography"),
    // Science
    ("What is the chemical symbol for gold?", "Au", "Science"),
    ("What planet is known as the Red Planet?", "Mars", "Science"),
    ("What is the hardest natural substance on Earth?", "Diamond", "Science"),
    ("What is the closest star to Earth?", "Sun", "Science"),
    // History
    ("In what year did World War II end?", "1945", "History"),
    ("Who was the first President of the United States?", "George Washington", "History"),
    ("What year did the Titanic sink?", "1912", "History"),
    ("Who painted the Mona Lisa?", "Leonardo da Vinci", "History"),
    // Entertainment
    ("What is the name of Harry Potter's owl?", "Hedwig", "Entertainment"),
    ("Who wrote the play 'Romeo and Juliet'?", "William Shakespeare", "Entertainment"),
    ("Who is the lead singer of the band U2?", "Bono", "Entertainment"),
    // Sports
    ("In which sport would you perform a slam dunk?", "Basketball", "Sports"),
    ("Which country won the FIFA World Cup in 2018?", "France", "Sports"),
    ("How many Olympic rings are there?", "5", "Sports"),
];

fn main() -> anyhow::Result<()> {
    init();

    let config = Config::load().expect("Failed to load configuration");
    let db = Database::open(&config.db_path)?;

    let existing = db.question_count()?;
    if existing > 0 {
        tracing::info!("Question bank already holds {existing} questions, nothing to seed");
        return Ok(());
    }

    for (prompt, answer, category) in SAMPLE_QUESTIONS {
        db.insert_question(prompt, answer, category, "medium", None)?;
    }
    tracing::info!("Seeded {} sample questions into {}", SAMPLE_QUESTIONS.len(), config.db_path);

    Ok(())
}
