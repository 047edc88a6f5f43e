//! User-facing strings. The organization works in Russian.

use crate::config::Period;

pub const BTN_KPI: &str = "📊 KPI";
pub const BTN_PLAN: &str = "🗓 План";
pub const BTN_STATISTICS: &str = "📈 Статистика";
pub const BTN_LEADER: &str = "🏆 Лидер дня";
pub const BTN_BONUS: &str = "💰 Мой бонус";
pub const BTN_INPUT: &str = "✏️ Ввод данных";
pub const BTN_ANNOUNCEMENT: &str = "📢 Объявление";
pub const BTN_CONFIRM: &str = "✅ Отправить";
pub const BTN_CANCEL: &str = "❌ Отмена";

pub const BTN_DAY: &str = "За день";
pub const BTN_WEEK: &str = "За неделю";
pub const BTN_GENERAL: &str = "Общая";
pub const BTN_KEY_VALUES: &str = "Ключевые показатели";
pub const BTN_FUNDS: &str = "Фонды";
pub const BTN_BACK: &str = "⬅️ Назад";

pub const NO_ACCESS: &str = "У вас нет доступа к боту. Обратитесь к администратору.";
pub const NO_RIGHTS: &str = "Недостаточно прав.";
pub const MENU_EXPIRED: &str = "Меню устарело";
pub const CANCELLED: &str = "Действие отменено.";
pub const NOTHING_TO_CANCEL: &str = "Нечего отменять.";
pub const MAIN_MENU: &str = "Главное меню.";
pub const USE_BUTTONS: &str = "Выберите вариант кнопкой выше или отправьте /cancel.";
pub const SHEETS_FAILED: &str = "Не удалось связаться с таблицей. Попробуйте позже.";

pub const HELP: &str = "Команды:\n\
/start - главное меню\n\
/help - эта справка\n\
/cancel - отменить текущее действие\n\n\
Кнопки меню:\n\
📊 KPI - внести показатели за сегодня\n\
🗓 План - внести план на день или неделю\n\
📈 Статистика - отчёты отдела, ключевые показатели, фонды\n\
🏆 Лидер дня - лучшие сотрудники сегодня\n\
💰 Мой бонус - текущий бонус\n\n\
Для администраторов:\n\
/users - список сотрудников\n\
/adduser - добавить сотрудника\n\
/deluser - удалить сотрудника\n\
✏️ Ввод данных, 📢 Объявление";

pub fn greeting(first_name: &str, contacts: &str) -> String {
    let mut text = format!("Здравствуйте, {first_name}! Я собираю KPI и присылаю отчёты.");
    if !contacts.is_empty() {
        text.push_str(&format!("\nПо вопросам доступа: {contacts}"));
    }
    text
}

pub const NOT_IN_TABLE: &str = "Вас нет в таблице KPI. Обратитесь к администратору.";
pub const NO_KPI_TODAY: &str = "Сегодня заполнять KPI не нужно.";
pub const WRITING: &str = "Записываю…";
pub const KPI_SAVED: &str = "Показатели записаны. Спасибо!";
pub const WRITE_FAILED: &str = "Не удалось записать данные в таблицу. Попробуйте позже.";

pub fn numbered_questions(header: &str, questions: &[&str]) -> String {
    let mut text = format!("{header}\n");
    for (i, question) in questions.iter().enumerate() {
        text.push_str(&format!("\n{}. {}", i + 1, question));
    }
    text
}

pub const KPI_HEADER: &str = "Ответьте одним сообщением, числа через пробел:";
pub const NO_PLANS: &str = "Для вас не настроены планы.";
pub const CHOOSE_PLAN_PERIOD: &str = "На какой период внести план?";
pub const PLAN_HEADER: &str = "Введите план одним сообщением, числа через пробел:";
pub const PLAN_SAVED: &str = "План записан.";

pub const ADD_USER_PROMPT: &str = "Отправьте данные сотрудника одной строкой:\n\
<id> <username> <имя> <фамилия> <отдел> <должность> <да|нет>\n\
Последнее поле: является ли сотрудник администратором.";
pub const ADD_USER_FORMAT: &str = "Неверный формат. Нужно 7 полей:\n\
<id> <username> <имя> <фамилия> <отдел> <должность> <да|нет>";
pub const USER_EXISTS: &str = "Сотрудник с таким id уже есть.";
pub const USER_ADDED: &str = "Сотрудник добавлен.";
pub const DEL_USER_PROMPT: &str = "Отправьте id сотрудника, которого нужно удалить.";
pub const ID_NOT_NUMBER: &str = "id должен быть числом.";
pub const USER_REMOVED: &str = "Сотрудник удалён.";
pub const USER_NOT_FOUND: &str = "Сотрудник с таким id не найден.";
pub const NO_USERS: &str = "Список сотрудников пуст.";

pub fn unknown_position(known: &str) -> String {
    format!("Неизвестный отдел или должность. Доступно:\n{known}")
}

pub const CHOOSE_INPUT: &str = "Какие данные внести?";
pub const NO_INPUTS: &str = "Поля для ввода не настроены.";
pub const ONE_NUMBER: &str = "Введите одно неотрицательное целое число.";
pub const INPUT_SAVED: &str = "Данные записаны.";

pub const ANNOUNCEMENT_PROMPT: &str = "Отправьте текст объявления.";
pub const ANNOUNCEMENT_PREVIEW: &str = "Так объявление увидят сотрудники. Отправить?";
pub const CHOOSE_ACTION: &str = "Выберите действие на клавиатуре.";
pub const ANNOUNCEMENT_CANCELLED: &str = "Объявление отменено.";

pub fn announcement(sender: &str, text: &str) -> String {
    format!("Отправитель: {sender}\n\n{text}")
}

pub fn announcement_sent(sent: usize, failed: usize) -> String {
    if failed == 0 {
        format!("Объявление отправлено ({sent}).")
    } else {
        format!("Объявление отправлено: {sent}, не доставлено: {failed}.")
    }
}

pub const CHOOSE_STATISTICS: &str = "Какую статистику показать?";
pub const CHOOSE_SECTION: &str = "Выберите отдел:";
pub const CHOOSE_PERIOD: &str = "За какой период?";
pub const NO_LEADER: &str = "Лидера дня пока нет.";
pub const NO_DATA: &str = "Нет данных.";
pub const NO_BONUS: &str = "Бонус для вас не настроен.";

pub fn bonus(value: &str) -> String {
    if value.is_empty() {
        "Ваш бонус на сегодня: 0".to_string()
    } else {
        format!("Ваш бонус на сегодня: {value}")
    }
}

pub const KPI_REMINDER: &str = "Напоминание: заполните KPI за сегодня (кнопка 📊 KPI).";
pub const KPI_REMINDER_SECOND: &str =
    "Вы ещё не заполнили KPI за сегодня! Пожалуйста, внесите данные (кнопка 📊 KPI).";
pub const PLAN_REMINDER: &str = "Напоминание: внесите план (кнопка 🗓 План).";
pub const PLAN_REMINDER_SECOND: &str = "План всё ещё не заполнен! Пожалуйста, внесите его (кнопка 🗓 План).";

pub fn period_label(period: Period) -> &'static str {
    match period {
        Period::Day => BTN_DAY,
        Period::Week => BTN_WEEK,
    }
}
