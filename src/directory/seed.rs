use super::records::QuizQuestion;

fn question(order: u32, text: &str, options: [&str; 4], correct_answer: usize) -> QuizQuestion {
    QuizQuestion {
        id: format!("q{order}"),
        question: text.to_owned(),
        options: options.iter().map(|option| (*option).to_owned()).collect(),
        correct_answer,
        order,
    }
}

/// Questions written into a freshly created directory file.
pub(super) fn default_questions() -> Vec<QuizQuestion> {
    vec![
        question(
            1,
            "What does it mean for a public blockchain to be transparent by default?",
            [
                "Only validators can read transactions",
                "Anyone can read every balance and transfer",
                "Transactions are deleted after a day",
                "Wallet owners choose who sees their history",
            ],
            1,
        ),
        question(
            2,
            "Which technique lets a contract compute over values it cannot read?",
            [
                "Fully homomorphic encryption",
                "Base64 encoding",
                "Address checksums",
                "Gas refunds",
            ],
            0,
        ),
        question(
            3,
            "Why is a pseudonymous wallet address not the same as privacy?",
            [
                "Addresses change every block",
                "Addresses are encrypted on chain",
                "Activity can be linked back to a person over time",
                "Explorers refuse to index them",
            ],
            2,
        ),
        question(
            4,
            "What does a zero-knowledge proof let you show?",
            [
                "Your private key to a verifier",
                "That a statement is true without revealing why",
                "The full transaction history of an account",
                "That a block was mined quickly",
            ],
            1,
        ),
    ]
}
