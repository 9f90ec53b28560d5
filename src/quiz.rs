use crate::genre::Genre;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;

pub const QUESTION_COUNT: usize = 5;

#[derive(Debug, Clone, Copy)]
pub struct AnswerOption {
    pub text: &'static str,
    pub increments: &'static [(Genre, f64)],
}

#[derive(Debug, Clone, Copy)]
pub struct Question {
    pub prompt: &'static str,
    pub weight: f64,
    pub options: &'static [AnswerOption],
}

use Genre::*;

pub static QUESTIONS: [Question; QUESTION_COUNT] = [
    Question {
        prompt: "1. 주말에 가장 하고 싶은 것은?",
        weight: 1.0,
        options: &[
            AnswerOption { text: "집에서 휴식", increments: &[(Drama, 1.0), (Romance, 1.0)] },
            AnswerOption { text: "친구와 놀기", increments: &[(Comedy, 2.0)] },
            AnswerOption { text: "새로운 곳 탐험", increments: &[(Action, 1.0), (Fantasy, 1.0)] },
            AnswerOption { text: "혼자 취미생활", increments: &[(SciFi, 2.0)] },
        ],
    },
    Question {
        prompt: "2. 스트레스 받으면?",
        weight: 1.0,
        options: &[
            AnswerOption { text: "혼자 있기", increments: &[(Drama, 2.0)] },
            AnswerOption { text: "수다 떨기", increments: &[(Comedy, 1.0), (Romance, 1.0)] },
            AnswerOption { text: "운동하기", increments: &[(Action, 2.0)] },
            AnswerOption { text: "맛있는 거 먹기", increments: &[(Comedy, 1.0), (Romance, 1.0)] },
        ],
    },
    Question {
        prompt: "3. 영화에서 중요한 것은?",
        weight: 1.5,
        options: &[
            AnswerOption { text: "감동 스토리", increments: &[(Drama, 2.0), (Romance, 1.0)] },
            AnswerOption { text: "시각적 영상미", increments: &[(Fantasy, 2.0), (SciFi, 1.0)] },
            AnswerOption { text: "깊은 메시지", increments: &[(Drama, 1.0), (SciFi, 2.0)] },
            AnswerOption { text: "웃는 재미", increments: &[(Comedy, 3.0)] },
        ],
    },
    Question {
        prompt: "4. 여행 스타일?",
        weight: 1.0,
        options: &[
            AnswerOption { text: "계획적", increments: &[(Drama, 1.0), (SciFi, 1.0)] },
            AnswerOption { text: "즉흥적", increments: &[(Comedy, 1.0), (Action, 1.0)] },
            AnswerOption { text: "액티비티", increments: &[(Action, 2.0)] },
            AnswerOption { text: "힐링", increments: &[(Romance, 2.0)] },
        ],
    },
    Question {
        prompt: "5. 친구 사이에서 나는?",
        weight: 1.0,
        options: &[
            AnswerOption { text: "듣는 역할", increments: &[(Drama, 1.0), (Romance, 1.0)] },
            AnswerOption { text: "주도하기", increments: &[(Action, 2.0)] },
            AnswerOption { text: "분위기 메이커", increments: &[(Comedy, 2.0)] },
            AnswerOption { text: "필요할 때 나타남", increments: &[(Fantasy, 1.0), (SciFi, 1.0)] },
        ],
    },
];

// Answer text -> (question index, option). Answer texts are unique across
// questions, so an answer is identified by its text alone.
static ANSWER_INDEX: Lazy<HashMap<&'static str, (usize, &'static AnswerOption)>> =
    Lazy::new(|| {
        QUESTIONS
            .iter()
            .enumerate()
            .flat_map(|(idx, q)| q.options.iter().map(move |opt| (opt.text, (idx, opt))))
            .collect()
    });

pub fn lookup_answer(text: &str) -> Option<(&'static Question, &'static AnswerOption)> {
    ANSWER_INDEX
        .get(text.trim())
        .map(|(idx, opt)| (&QUESTIONS[*idx], *opt))
}

#[derive(Debug, Serialize)]
pub struct QuestionView {
    pub prompt: &'static str,
    pub weight: f64,
    pub options: Vec<&'static str>,
}

pub fn question_views() -> Vec<QuestionView> {
    QUESTIONS
        .iter()
        .map(|q| QuestionView {
            prompt: q.prompt,
            weight: q.weight,
            options: q.options.iter().map(|o| o.text).collect(),
        })
        .collect()
}
