//! Colored terminal rendering of study material

use std::io::{self, Write};

use termcolor::{Color, ColorSpec, WriteColor};

use crate::search::SearchResult;
use crate::types::{Flashcard, Quiz, QuizQuestion, StudySet};

const OPTION_LETTERS: [char; 4] = ['A', 'B', 'C', 'D'];

fn heading(out: &mut impl WriteColor, text: &str) -> io::Result<()> {
    let mut spec = ColorSpec::new();
    spec.set_fg(Some(Color::Rgb(70, 130, 180))).set_bold(true);
    out.set_color(&spec)?;
    writeln!(out, "{text}")?;
    out.reset()
}

fn dim(out: &mut impl WriteColor, text: &str) -> io::Result<()> {
    let mut spec = ColorSpec::new();
    spec.set_dimmed(true);
    out.set_color(&spec)?;
    write!(out, "{text}")?;
    out.reset()
}

pub fn render_flashcards(out: &mut impl WriteColor, flashcards: &[Flashcard]) -> io::Result<()> {
    heading(out, &format!("Flashcards ({})", flashcards.len()))?;
    for (i, card) in flashcards.iter().enumerate() {
        let mut spec = ColorSpec::new();
        spec.set_bold(true);
        out.set_color(&spec)?;
        writeln!(out, "{:>3}. {}", i + 1, card.question)?;
        out.reset()?;
        writeln!(out, "     {}", card.answer)?;
    }
    Ok(())
}

pub fn render_quiz(out: &mut impl WriteColor, quiz: &Quiz) -> io::Result<()> {
    heading(out, &format!("{} ({} questions)", quiz.title, quiz.questions.len()))?;
    let mut correct = ColorSpec::new();
    correct.set_fg(Some(Color::Green));

    for (i, question) in quiz.questions.iter().enumerate() {
        writeln!(out, "{:>3}. {}", i + 1, question.question())?;
        match question {
            QuizQuestion::MultipleChoice {
                options,
                correct_answer,
                ..
            } => {
                for (index, (letter, option)) in OPTION_LETTERS.iter().zip(options).enumerate() {
                    if index == *correct_answer {
                        out.set_color(&correct)?;
                        writeln!(out, "     {letter}) {option} *")?;
                        out.reset()?;
                    } else {
                        writeln!(out, "     {letter}) {option}")?;
                    }
                }
            }
            QuizQuestion::TrueFalse { correct_answer, .. } => {
                out.set_color(&correct)?;
                writeln!(
                    out,
                    "     Answer: {}",
                    if *correct_answer { "True" } else { "False" }
                )?;
                out.reset()?;
            }
        }
        if let Some(explanation) = question.explanation() {
            dim(out, &format!("     {explanation}\n"))?;
        }
    }
    Ok(())
}

/// Topic, summary, flashcards and quiz of a study set
pub fn render_study_set(out: &mut impl WriteColor, study_set: &StudySet) -> io::Result<()> {
    let mut title = ColorSpec::new();
    title.set_fg(Some(Color::Rgb(255, 99, 71))).set_bold(true);
    out.set_color(&title)?;
    writeln!(out, "{}", study_set.topic)?;
    out.reset()?;
    dim(
        out,
        &format!("id {}  created {}\n\n", study_set.id, study_set.created_at),
    )?;

    heading(out, "Summary")?;
    writeln!(out, "{}\n", study_set.summary)?;
    render_flashcards(out, &study_set.flashcards)?;
    writeln!(out)?;
    render_quiz(out, &study_set.quiz)
}

/// One line per study set, for listings
pub fn render_study_set_line(out: &mut impl WriteColor, study_set: &StudySet) -> io::Result<()> {
    let mut id = ColorSpec::new();
    id.set_fg(Some(Color::Cyan));
    out.set_color(&id)?;
    write!(out, "{}", study_set.id)?;
    out.reset()?;
    writeln!(
        out,
        "  {}  ({} flashcards, {} questions, {})",
        study_set.topic,
        study_set.flashcards.len(),
        study_set.quiz.questions.len(),
        study_set.created_at
    )
}

pub fn render_search_results(out: &mut impl WriteColor, results: &[SearchResult]) -> io::Result<()> {
    writeln!(out, "Found {} results", results.len())?;
    let mut academic = ColorSpec::new();
    academic.set_fg(Some(Color::Green));
    for (i, result) in results.iter().enumerate() {
        write!(out, "{}. {}", i + 1, result.title)?;
        if result.is_academic() {
            out.set_color(&academic)?;
            write!(out, " [academic]")?;
            out.reset()?;
        }
        writeln!(out)?;
        writeln!(out, "   URL: {}", result.link)?;
        let preview = result
            .content
            .as_deref()
            .unwrap_or(&result.snippet)
            .chars()
            .take(160)
            .collect::<String>();
        dim(out, &format!("   {preview}\n"))?;
        writeln!(out)?;
    }
    Ok(())
}
