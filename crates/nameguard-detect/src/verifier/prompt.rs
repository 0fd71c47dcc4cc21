//! Prompt construction for the generative verifier
//!
//! The instruction is written in Ukrainian, lists the payment vocabulary the
//! model must not mistake for names, and pins the answer to one of five
//! tagged formats so the parser stays simple. The framing follows the Gemma
//! chat template.

/// Build the verification prompt for one comment
pub fn build_prompt(comment: &str) -> String {
    format!(
        "<bos><start_of_turn>user\n\
         Проаналізуй український платіжний коментар. Визнач, чи містить він \
         ПІБ людини (прізвище, ім'я, по батькові).\n\n\
         ІГНОРУЙ ці слова як НЕ імена: зарплата, премія, аванс, виплата, \
         переказ, податки, поповнення, рахунок, оплата, послуги, товари.\n\n\
         Відповідь дай СТРОГО в одному з форматів:\n\
         ПОВНЕ_ПІБ | прізвище ім'я по-батькові\n\
         ПРІЗВИЩЕ_ІМЯ | прізвище ім'я\n\
         ТІЛЬКИ_ПРІЗВИЩЕ | прізвище\n\
         ТІЛЬКИ_ІМЯ | ім'я\n\
         НЕМАЄ_ПІБ\n\n\
         Коментар: {}<end_of_turn>\n\
         <start_of_turn>model\n",
        comment
    )
}

/// Sequences after which generation must stop
pub const STOP_SEQUENCES: &[&str] = &["<end_of_turn>", "\nКоментар:"];
