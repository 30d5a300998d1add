//! Review cards posted to the admin channel.
//!
//! A card is plain text: a header line followed by one paragraph per filled-in
//! field. Empty fields leave nothing behind, neither the label nor the blank
//! line. Graduate cards end with a hashtag line, right under the last field,
//! built from the cities and universities so admins can search the channel
//! history.

use crate::callback::Action;
use crate::model::{Applicant, GraduateForm, Role, StudentForm};
use crate::texts;

/// Renders the review text for an applicant.
pub fn render(applicant: &Applicant) -> String {
    match applicant {
        Applicant::Student(form) => render_student(form),
        Applicant::Graduate(form) => render_graduate(form),
    }
}

fn render_student(form: &StudentForm) -> String {
    Card::new(header(Role::Student))
        .field("Имя", &form.name)
        .field("Класс", &form.class)
        .nickname(&form.nickname)
        .finish()
}

fn render_graduate(form: &GraduateForm) -> String {
    Card::new(header(Role::Graduate))
        .field("Имя", &form.name)
        .field("Выпуск", &form.year)
        .field("Класс", &form.class)
        .field("Города", &form.city_info)
        .field("ВУЗы", &form.university_info)
        .field("Работа", &form.work_info)
        .field("Дополнительно о себе", &form.extra_info)
        .nickname(&form.nickname)
        .tags(hashtags(form))
        .finish()
}

/// Header line of a freshly submitted card.
pub fn header(role: Role) -> &'static str {
    match role {
        Role::Student => texts::STUDENT_CARD_HEADER,
        Role::Graduate => texts::GRADUATE_CARD_HEADER,
    }
}

/// Header used when an accepted card is re-posted to the public thread.
pub fn member_header(role: Role) -> &'static str {
    match role {
        Role::Student => texts::STUDENT_MEMBER_HEADER,
        Role::Graduate => texts::GRADUATE_MEMBER_HEADER,
    }
}

/// Public-thread variant of an admin card: the submission header becomes the
/// new-member header, the rest of the card is kept as is.
pub fn broadcast_text(card_text: &str, role: Role) -> String {
    card_text.replace(header(role), member_header(role))
}

/// Banner prepended to the admin card once a decision is made.
pub fn banner(action: Action) -> &'static str {
    match action {
        Action::Accept => texts::ACCEPTED_BANNER,
        Action::Reject => texts::REJECTED_BANNER,
    }
}

pub fn with_banner(action: Action, card_text: &str) -> String {
    format!("{}\n\n{}", banner(action), card_text)
}

/// Review state of an admin card, read back from the message itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationState {
    Pending,
    Accepted,
    Rejected,
}

impl ModerationState {
    pub fn from_card_text(text: &str) -> Self {
        if text.starts_with(texts::ACCEPTED_BANNER) {
            ModerationState::Accepted
        } else if text.starts_with(texts::REJECTED_BANNER) {
            ModerationState::Rejected
        } else {
            ModerationState::Pending
        }
    }

    pub fn is_decided(&self) -> bool {
        !matches!(self, ModerationState::Pending)
    }
}

/// Hashtags derived from the comma-separated city and university lists.
///
/// Each entry is trimmed and lower-cased; every run of characters other than
/// letters, digits and `_` becomes a single `_`, and separators at the edges
/// are dropped. Entries with nothing left are skipped.
pub fn hashtags(form: &GraduateForm) -> Vec<String> {
    [form.city_info.as_str(), form.university_info.as_str()]
        .into_iter()
        .flat_map(|list| list.split(','))
        .filter_map(hashtag)
        .collect()
}

fn hashtag(entry: &str) -> Option<String> {
    let mut tag = String::with_capacity(entry.len());
    let mut separator = false;

    for c in entry.trim().to_lowercase().chars() {
        if c.is_alphanumeric() || c == '_' {
            if separator && !tag.is_empty() {
                tag.push('_');
            }
            separator = false;
            tag.push(c);
        } else {
            separator = true;
        }
    }

    if tag.is_empty() {
        None
    } else {
        Some(format!("#{}", tag))
    }
}

struct Card {
    paragraphs: Vec<String>,
    tags: Vec<String>,
}

impl Card {
    fn new(header: &str) -> Self {
        Self {
            paragraphs: vec![header.to_string()],
            tags: Vec::new(),
        }
    }

    fn field(self, label: &str, value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() {
            return self;
        }
        self.line(format!("{}: {}", label, value))
    }

    fn nickname(self, value: &str) -> Self {
        let nickname = value.trim().trim_start_matches('@');
        if nickname.is_empty() {
            return self;
        }
        self.line(format!("Ник: @{}", nickname))
    }

    fn line(mut self, line: String) -> Self {
        if !line.is_empty() {
            self.paragraphs.push(line);
        }
        self
    }

    /// Hashtags go on the line right below the last paragraph.
    fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    fn finish(self) -> String {
        let mut text = self.paragraphs.join("\n\n");
        if !self.tags.is_empty() {
            text.push('\n');
            text.push_str(&self.tags.join(" "));
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn graduate() -> GraduateForm {
        GraduateForm {
            tg_id: 1001,
            nickname: "ann".to_string(),
            name: "Анна".to_string(),
            year: "2015".to_string(),
            class: "11Б".to_string(),
            city_info: "Moscow, St. Petersburg".to_string(),
            university_info: "МГУ".to_string(),
            work_info: "Яндекс".to_string(),
            extra_info: "Люблю походы".to_string(),
        }
    }

    #[test]
    fn test_render_full_student() {
        let card = render(&Applicant::Student(StudentForm {
            tg_id: 7,
            nickname: "neo".to_string(),
            name: "Томас".to_string(),
            class: "10А".to_string(),
        }));

        assert_eq!(
            card,
            "Новая заявка от лицеиста!\n\nИмя: Томас\n\nКласс: 10А\n\nНик: @neo"
        );
    }

    #[test]
    fn test_render_student_without_optional_fields() {
        let card = render(&Applicant::Student(StudentForm {
            tg_id: 7,
            nickname: String::new(),
            name: "Томас".to_string(),
            class: "   ".to_string(),
        }));

        assert_eq!(card, "Новая заявка от лицеиста!\n\nИмя: Томас");
        assert!(!card.contains("Класс"));
        assert!(!card.contains("Ник"));
        assert!(!card.contains("\n\n\n"));
    }

    #[test]
    fn test_render_full_graduate() {
        let card = render(&Applicant::Graduate(graduate()));

        assert_eq!(
            card,
            "Новая заявка от выпускника!\n\n\
             Имя: Анна\n\n\
             Выпуск: 2015\n\n\
             Класс: 11Б\n\n\
             Города: Moscow, St. Petersburg\n\n\
             ВУЗы: МГУ\n\n\
             Работа: Яндекс\n\n\
             Дополнительно о себе: Люблю походы\n\n\
             Ник: @ann\n\
             #moscow #st_petersburg #мгу"
        );
    }

    #[test]
    fn test_render_graduate_each_empty_field_disappears() {
        let cases: [(&str, fn(&mut GraduateForm)); 6] = [
            ("Имя", |f| f.name.clear()),
            ("Выпуск", |f| f.year.clear()),
            ("Класс", |f| f.class.clear()),
            ("Работа", |f| f.work_info.clear()),
            ("Дополнительно о себе", |f| f.extra_info.clear()),
            ("Ник", |f| f.nickname.clear()),
        ];
        for (label, clear) in cases {
            let mut form = graduate();
            clear(&mut form);

            let card = render(&Applicant::Graduate(form));
            assert!(!card.contains(&format!("{}:", label)), "{} should be omitted", label);
            assert!(!card.contains("\n\n\n"), "no blank gap for {}", label);
        }
    }

    #[test]
    fn test_render_graduate_without_lists_has_no_hashtag_line() {
        let mut form = graduate();
        form.city_info.clear();
        form.university_info.clear();

        let card = render(&Applicant::Graduate(form));
        assert!(!card.contains('#'));
        assert!(card.ends_with("Ник: @ann"));
    }

    #[test]
    fn test_hashtag_line_follows_last_field_directly() {
        let card = render(&Applicant::Graduate(graduate()));
        let (body, tags) = card.rsplit_once('\n').unwrap();

        assert!(body.ends_with("Ник: @ann"));
        assert_eq!(tags, "#moscow #st_petersburg #мгу");
    }

    #[test]
    fn test_nickname_with_at_sign_is_not_doubled() {
        let mut form = graduate();
        form.nickname = "@ann".to_string();
        let card = render(&Applicant::Graduate(form));
        assert!(card.contains("Ник: @ann"));
        assert!(!card.contains("@@"));
    }

    #[test]
    fn test_hashtags_sanitize_and_fold_case() {
        let form = graduate();
        assert_eq!(hashtags(&form), vec!["#moscow", "#st_petersburg", "#мгу"]);
    }

    #[test]
    fn test_hashtags_skip_empty_entries() {
        let mut form = graduate();
        form.city_info = "Kazan,, ,".to_string();
        form.university_info = "ВШЭ (ФКН), MIT!".to_string();
        assert_eq!(hashtags(&form), vec!["#kazan", "#вшэ_фкн", "#mit"]);
    }

    #[test]
    fn test_hashtags_keep_underscores_and_digits() {
        let mut form = graduate();
        form.city_info = "new_york 2".to_string();
        form.university_info.clear();
        assert_eq!(hashtags(&form), vec!["#new_york_2"]);
    }

    #[test]
    fn test_broadcast_text_swaps_header() {
        let card = render(&Applicant::Graduate(graduate()));
        let public = broadcast_text(&card, Role::Graduate);

        assert!(public.starts_with("Новый выпускник!\n\nИмя: Анна"));
        assert!(!public.contains("Новая заявка"));
    }

    #[test]
    fn test_with_banner() {
        assert_eq!(
            with_banner(Action::Reject, "card"),
            "Заявка отклонена!\n\ncard"
        );
        assert!(with_banner(Action::Accept, "card").starts_with("Заявка принята!"));
    }

    #[test]
    fn test_moderation_state_from_card_text() {
        let card = render(&Applicant::Graduate(graduate()));
        assert_eq!(ModerationState::from_card_text(&card), ModerationState::Pending);
        assert_eq!(
            ModerationState::from_card_text(&with_banner(Action::Accept, &card)),
            ModerationState::Accepted
        );
        assert_eq!(
            ModerationState::from_card_text(&with_banner(Action::Reject, &card)),
            ModerationState::Rejected
        );
        assert!(!ModerationState::Pending.is_decided());
    }
}
