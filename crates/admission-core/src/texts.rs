//! User-facing message texts.

use indoc::indoc;

pub const STUDENT_CARD_HEADER: &str = "Новая заявка от лицеиста!";
pub const GRADUATE_CARD_HEADER: &str = "Новая заявка от выпускника!";
pub const STUDENT_MEMBER_HEADER: &str = "Новый лицеист!";
pub const GRADUATE_MEMBER_HEADER: &str = "Новый выпускник!";

pub const ACCEPTED_BANNER: &str = "Заявка принята!";
pub const REJECTED_BANNER: &str = "Заявка отклонена!";

pub const ACCEPT_BUTTON: &str = "Принять";
pub const REJECT_BUTTON: &str = "Отклонить";

pub const STUDENT_ROLE_BUTTON: &str = "Ученик лицея";
pub const GRADUATE_ROLE_BUTTON: &str = "Выпускник лицея";
pub const REGISTER_BUTTON: &str = "Пройти регистрацию";

pub const GREETING: &str = "Привет! Напиши /start чтобы начать!";
pub const CHOOSE_ROLE: &str = "Привет! Выбери кто ты";
pub const ALREADY_MEMBER: &str = "Привет! Ты уже состоишь в группе лицея!";

pub const FILL_FORM: &str = indoc! {"
    Пожалуйста, заполни данные о себе в этой форме. \
    Мы принимаем в чат только по заявкам и не анонимно"};

pub const UNKNOWN_ROLE: &str = "Не получилось определить, кто ты. Напиши /start и выбери вариант ещё раз.";

pub const ACCEPTED_NOTICE: &str = "Ваша заявка была принята! Вот одноразовая ссылка на вступление в группу:";

pub const STUDENT_INTAKE_ERROR: &str = "Ошибка обработки данных лицеиста";
pub const GRADUATE_INTAKE_ERROR: &str = "Ошибка обработки данных выпускника";
pub const DECISION_ERROR: &str = "Ошибка обработки решения по заявке";

pub const DEFAULT_INVITE_LINK_NAME: &str = "Ссылка на вступление в чат с выпускниками";

/// Message sent to an applicant whose request was turned down.
pub fn rejected_notice(contacts: &[String]) -> String {
    if contacts.is_empty() {
        return "Ваша заявка была отклонена!".to_string();
    }
    format!(
        "Ваша заявка была отклонена! Свяжитесь с {}, если есть вопросы.",
        contacts.join(" или ")
    )
}

/// Message carrying the single-use invite link.
pub fn accepted_notice(invite_link: &str) -> String {
    format!("{}\n{}", ACCEPTED_NOTICE, invite_link)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_notice_lists_contacts() {
        let contacts = vec!["@kroexov".to_string(), "@mikhailpuminov".to_string()];
        assert_eq!(
            rejected_notice(&contacts),
            "Ваша заявка была отклонена! Свяжитесь с @kroexov или @mikhailpuminov, если есть вопросы."
        );
    }

    #[test]
    fn test_rejected_notice_without_contacts() {
        assert_eq!(rejected_notice(&[]), "Ваша заявка была отклонена!");
    }

    #[test]
    fn test_fill_form_is_single_line() {
        assert!(!FILL_FORM.contains('\n'));
        assert!(FILL_FORM.ends_with("не анонимно"));
    }
}
