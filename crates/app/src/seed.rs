use chrono::NaiveDate;

use exam_core::model::{Exam, ExamId, Examinee, ExamineeId, Question, QuestionId};
use storage::repository::{Storage, StorageError};

const STUDENTS: [&str; 4] = [
    "Anna Petrova",
    "Boris Ivanov",
    "Vera Annenkova",
    "Dmitry Sokolov",
];

const ANATOMY: [(&str, &str); 8] = [
    ("Name the bones of the forearm.", "Radius and ulna."),
    ("Which chamber of the heart pumps blood to the body?", "The left ventricle."),
    ("What connects muscle to bone?", "Tendons."),
    ("Name the largest organ of the human body.", "The skin."),
    ("Where is the hippocampus located?", "In the medial temporal lobe."),
    ("How many pairs of ribs does an adult have?", "Twelve."),
    ("Which nerve innervates the diaphragm?", "The phrenic nerve."),
    ("What is the functional unit of the kidney?", "The nephron."),
];

const PHYSIOLOGY: [(&str, &str); 7] = [
    ("What is the normal resting heart rate range?", "60 to 100 beats per minute."),
    ("Which hormone lowers blood glucose?", "Insulin."),
    ("Where does gas exchange take place in the lungs?", "In the alveoli."),
    ("What ion triggers muscle contraction?", "Calcium."),
    ("What does the SA node do?", "It sets the pace of the heartbeat."),
    ("Which organ produces bile?", "The liver."),
    ("What is the main function of red blood cells?", "Carrying oxygen."),
];

/// Upserts a fixed demo directory; running it twice leaves the same data.
pub async fn run(storage: &Storage) -> Result<String, StorageError> {
    for (i, name) in STUDENTS.iter().enumerate() {
        let id = ExamineeId::new(i as u64 + 1);
        storage.students.upsert_student(&Examinee::new(id, *name)).await?;
    }

    let exams = [
        (1, "Anatomy", NaiveDate::from_ymd_opt(2024, 6, 10), &ANATOMY[..]),
        (2, "Physiology", NaiveDate::from_ymd_opt(2024, 6, 17), &PHYSIOLOGY[..]),
    ];
    let mut next_question = 1;
    for (id, name, held_on, pool) in exams {
        let exam_id = ExamId::new(id);
        storage
            .exams
            .upsert_exam(&Exam::new(exam_id, name, held_on))
            .await?;
        for (text, answer) in pool {
            let question = Question::new(QuestionId::new(next_question), exam_id, *text, *answer);
            storage.questions.upsert_question(&question).await?;
            next_question += 1;
        }
    }

    Ok(format!(
        "Seeded {} students, {} exams and {} questions",
        STUDENTS.len(),
        exams.len(),
        next_question - 1
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let storage = Storage::in_memory();
        run(&storage).await.unwrap();
        run(&storage).await.unwrap();

        assert_eq!(storage.students.list_students().await.unwrap().len(), 4);
        let exams = storage.exams.list_exams().await.unwrap();
        assert_eq!(exams.len(), 2);
        assert!(exams.iter().all(|e| e.held_on.is_some()));
        assert!(
            storage
                .questions
                .random_question(ExamId::new(2))
                .await
                .unwrap()
                .is_some()
        );
    }
}
