use crate::flow::callback::MenuAction;
use crate::flow::session::Language;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Msg {
    Welcome,
    WelcomeLimited,
    Help,
    MainMenu,
    CalendarDisabled,
    AccessDenied,
    Cancelled,
    ErrorOccurred,
    FlowExpired,
    SelectDate,
    SelectTime,
    SelectMinutes,
    EnterTitle,
    EventCreated,
    EventFailed,
    UpcomingEvents,
    NoUpcoming,
    TodaySchedule,
    NoToday,
    DateSchedule,
    NoDate,
    SearchQuery,
    FoundEvents,
    NoFound,
    SelectDelete,
    NoDelete,
    ConfirmDelete,
    EventDeleted,
    DeleteFailed,
    SelectEdit,
    NoEdit,
    EnterNewTitle,
    TitleUpdated,
    UpdateFailed,
    PickByNumber,
    InvalidDate,
    InvalidTime,
    InvalidNumber,
    InvalidEventNumber,
    EmptyText,
    UnexpectedInput,
    ErrorNoDatetime,
    EnterTaskTitle,
    TaskAdded,
    NoTasks,
    TasksHeader,
    TaskCompleted,
    TaskDeleted,
    EnterNoteTitle,
    EnterNoteContent,
    NoteSaved,
    NoNotes,
    NotesHeader,
    NoteDeleted,
    MatchingTasks,
    MatchingNotes,
    Failed,
    UnclearTime,
    NeedQuery,
    NeedDeleteTarget,
    NeedUpdateTarget,
    NothingToUpdate,
    AmbiguousMatches,
    DeletedTitle,
    EventUpdated,
    SelectLanguage,
    LanguageChanged,
    BtnCancel,
    BtnBackToHours,
    BtnConfirmDelete,
    BtnBack,
    BtnComplete,
    BtnDelete,
    BtnView,
}

/// Looks up `msg`; `{name}` placeholders are filled by [`trf`].
pub fn tr(lang: Language, msg: Msg) -> &'static str {
    match lang {
        Language::En => en(msg),
        Language::Fa => fa(msg),
    }
}

pub fn trf(lang: Language, msg: Msg, args: &[(&str, &str)]) -> String {
    args.iter()
        .fold(tr(lang, msg).to_string(), |text, (name, value)| {
            text.replace(&format!("{{{}}}", name), value)
        })
}

pub fn menu_label(lang: Language, action: MenuAction) -> &'static str {
    match (lang, action) {
        (Language::En, MenuAction::Main) => "🔙 Main Menu",
        (Language::En, MenuAction::CreateEvent) => "➕ Add Event",
        (Language::En, MenuAction::Upcoming) => "📅 Upcoming",
        (Language::En, MenuAction::Today) => "📋 Today",
        (Language::En, MenuAction::Search) => "🔍 Search",
        (Language::En, MenuAction::Delete) => "🗑️ Delete Event",
        (Language::En, MenuAction::Edit) => "✏️ Edit Event",
        (Language::En, MenuAction::AddTask) => "✅ Add Task",
        (Language::En, MenuAction::Tasks) => "📝 Tasks",
        (Language::En, MenuAction::AddNote) => "🗒️ Add Note",
        (Language::En, MenuAction::Notes) => "📒 Notes",
        (Language::En, MenuAction::Language) => "🌐 Language",
        (Language::En, MenuAction::Help) => "❓ Help",
        (Language::Fa, MenuAction::Main) => "🔙 منوی اصلی",
        (Language::Fa, MenuAction::CreateEvent) => "➕ رویداد جدید",
        (Language::Fa, MenuAction::Upcoming) => "📅 رویدادهای آینده",
        (Language::Fa, MenuAction::Today) => "📋 امروز",
        (Language::Fa, MenuAction::Search) => "🔍 جستجو",
        (Language::Fa, MenuAction::Delete) => "🗑️ حذف رویداد",
        (Language::Fa, MenuAction::Edit) => "✏️ ویرایش",
        (Language::Fa, MenuAction::AddTask) => "✅ وظیفه جدید",
        (Language::Fa, MenuAction::Tasks) => "📝 وظایف",
        (Language::Fa, MenuAction::AddNote) => "🗒️ یادداشت جدید",
        (Language::Fa, MenuAction::Notes) => "📒 یادداشت‌ها",
        (Language::Fa, MenuAction::Language) => "🌐 زبان",
        (Language::Fa, MenuAction::Help) => "❓ راهنما",
    }
}

/// Exact label match in any supported language.
pub fn menu_action_for_label(text: &str) -> Option<MenuAction> {
    let text = text.trim();
    MenuAction::ALL.into_iter().find(|action| {
        [Language::En, Language::Fa]
            .into_iter()
            .any(|lang| menu_label(lang, *action) == text)
    })
}

pub fn is_cancel_token(text: &str) -> bool {
    let text = text.trim();
    matches!(text.to_lowercase().as_str(), "cancel" | "/cancel" | "لغو")
        || [Language::En, Language::Fa]
            .into_iter()
            .any(|lang| tr(lang, Msg::BtnCancel) == text)
}

fn en(msg: Msg) -> &'static str {
    match msg {
        Msg::Welcome => "🤖 Welcome to {bot_name}!{calendar_status}\n\nI'm your intelligent calendar and task management assistant.\n\nUse the buttons below or talk to me naturally!\n\nExamples:\n• \"Schedule a meeting tomorrow at 2pm\"\n• \"What's on my calendar today?\"\n• \"Show my upcoming events\"",
        Msg::WelcomeLimited => "\n⚠️ Calendar features currently disabled. Please add CALCOM_API_KEY to enable.",
        Msg::Help => "📖 How to use me:\n\n🗣️ Natural Language:\nJust talk to me like you would to a human assistant!\n• \"Schedule a meeting with John tomorrow at 3pm\"\n• \"What do I have on Monday?\"\n• \"Delete the dentist appointment\"\n\n⚡ Quick Commands:\n/today - View today's events\n/upcoming - View upcoming events\n/create - Create event with date picker 📅\n/menu - Show the main menu\n/help - Show this help\n\nType \"cancel\" at any time to stop the current step.",
        Msg::MainMenu => "🤖 Main Menu\n\nChoose an action:",
        Msg::CalendarDisabled => "❌ Calendar features are disabled.",
        Msg::AccessDenied => "⛔ Sorry, only the bot owner can use this feature. You can still chat with me!",
        Msg::Cancelled => "❌ Cancelled.",
        Msg::ErrorOccurred => "I apologize, but I encountered an error processing your request. Could you please try again?",
        Msg::FlowExpired => "❌ This step is no longer active. Please start again from the menu.",
        Msg::SelectDate => "📅 Select a date for your event (or type YYYY-MM-DD, 'today' or 'tomorrow'):",
        Msg::SelectTime => "📅 Date: {date}\n\n⏰ Select a time (or type it, e.g. 14:30 or 2:30 PM):",
        Msg::SelectMinutes => "⏰ Select minutes for {hour}:__",
        Msg::EnterTitle => "📝 Please type the event title/description:",
        Msg::EventCreated => "✅ Event created successfully!",
        Msg::EventFailed => "❌ Failed to create event: {error}",
        Msg::UpcomingEvents => "📅 Your Upcoming Events:",
        Msg::NoUpcoming => "You have no upcoming events. Your schedule is clear! ✨",
        Msg::TodaySchedule => "📋 Today's Schedule ({date}):",
        Msg::NoToday => "No events scheduled for today ({date}). Enjoy your free day! 🌟",
        Msg::DateSchedule => "📋 Schedule for {date}:",
        Msg::NoDate => "No events scheduled for {date}.",
        Msg::SearchQuery => "🔍 Please type the event name or keyword you want to search for:",
        Msg::FoundEvents => "🔍 Found events matching '{query}':",
        Msg::NoFound => "No events found matching '{query}'.",
        Msg::SelectDelete => "🗑️ Select an event to delete:",
        Msg::NoDelete => "You have no upcoming events to delete.",
        Msg::ConfirmDelete => "⚠️ Are you sure you want to delete this event?",
        Msg::EventDeleted => "✅ Event deleted successfully!",
        Msg::DeleteFailed => "❌ Failed to delete event: {error}",
        Msg::SelectEdit => "✏️ Select an event to edit:",
        Msg::NoEdit => "No upcoming events to edit.",
        Msg::EnterNewTitle => "✏️ Editing: {title}\n\n📝 Please type the new title:",
        Msg::TitleUpdated => "✅ Event title updated to: {title}",
        Msg::UpdateFailed => "❌ Failed to update event: {error}",
        Msg::PickByNumber => "Tap a button or type the event number.",
        Msg::InvalidDate => "❌ Invalid date format. Please use YYYY-MM-DD (e.g., 2025-11-25) or type 'today' or 'tomorrow':",
        Msg::InvalidTime => "❌ Invalid time format. Please use HH:MM format (e.g., 14:30 or 2:30 PM):",
        Msg::InvalidNumber => "❌ Please enter a valid number:",
        Msg::InvalidEventNumber => "❌ Invalid event number. Please try again.",
        Msg::EmptyText => "❌ Please type some text:",
        Msg::UnexpectedInput => "❌ That doesn't fit this step.",
        Msg::ErrorNoDatetime => "❌ Error: No date/time selected. Please try again.",
        Msg::EnterTaskTitle => "✅ What's the task?",
        Msg::TaskAdded => "✅ Task #{id} added: {title}",
        Msg::NoTasks => "You have no open tasks. 🎉",
        Msg::TasksHeader => "📝 Your Tasks:",
        Msg::TaskCompleted => "✅ Completed: {title}",
        Msg::TaskDeleted => "🗑️ Deleted task: {title}",
        Msg::EnterNoteTitle => "🗒️ Please type the note title:",
        Msg::EnterNoteContent => "🗒️ {title}\n\nNow type the note content:",
        Msg::NoteSaved => "✅ Note #{id} saved: {title}",
        Msg::NoNotes => "You have no notes yet.",
        Msg::NotesHeader => "📒 Your Notes:",
        Msg::NoteDeleted => "🗑️ Deleted note: {title}",
        Msg::MatchingTasks => "📝 Matching tasks:",
        Msg::MatchingNotes => "📒 Matching notes:",
        Msg::Failed => "❌ {error}",
        Msg::UnclearTime => "I couldn't understand the time you specified. Please try again with a clearer time description.",
        Msg::NeedQuery => "Please specify what you want to search for.",
        Msg::NeedDeleteTarget => "Please specify which event you want to delete.",
        Msg::NeedUpdateTarget => "Please specify which event you want to update.",
        Msg::NothingToUpdate => "What would you like to change about this event?",
        Msg::AmbiguousMatches => "Found {count} events matching '{query}'. Please be more specific:",
        Msg::DeletedTitle => "✅ Deleted: {title}",
        Msg::EventUpdated => "✅ Event updated successfully!",
        Msg::SelectLanguage => "🌐 Select your language:\n\nانتخاب زبان:",
        Msg::LanguageChanged => "✅ Language changed to English",
        Msg::BtnCancel => "❌ Cancel",
        Msg::BtnBackToHours => "🔙 Back to Hours",
        Msg::BtnConfirmDelete => "✅ Yes, Delete",
        Msg::BtnBack => "🔙 Back",
        Msg::BtnComplete => "✅ Done",
        Msg::BtnDelete => "🗑️ Delete",
        Msg::BtnView => "👁️ View",
    }
}

fn fa(msg: Msg) -> &'static str {
    match msg {
        Msg::Welcome => "🤖 به {bot_name} خوش آمدید!{calendar_status}\n\nمن دستیار هوشمند تقویم و مدیریت وظایف شما هستم.\n\nاز دکمه‌های زیر استفاده کنید یا به صورت طبیعی با من صحبت کنید!\n\nمثال‌ها:\n• \"فردا ساعت ۲ بعدازظهر جلسه بذار\"\n• \"امروز چه برنامه‌ای دارم؟\"\n• \"رویدادهای آینده رو نشون بده\"",
        Msg::WelcomeLimited => "\n⚠️ امکانات تقویم غیرفعال است. لطفاً CALCOM_API_KEY را اضافه کنید.",
        Msg::Help => "📖 راهنما:\n\n🗣️ زبان طبیعی:\nمی‌توانید به صورت طبیعی تایپ کنید!\n\n⚡ دستورات:\n/today - رویدادهای امروز\n/upcoming - رویدادهای آینده\n/create - ساخت رویداد با تقویم 📅\n/menu - نمایش منو\n/help - نمایش راهنما\n\nبرای توقف مرحله فعلی \"لغو\" را تایپ کنید.",
        Msg::MainMenu => "🤖 منوی اصلی\n\nیک گزینه را انتخاب کنید:",
        Msg::CalendarDisabled => "❌ امکانات تقویم غیرفعال است.",
        Msg::AccessDenied => "⛔ متأسفم، فقط مالک ربات می‌تواند از این امکان استفاده کند. همچنان می‌توانید با من گفتگو کنید!",
        Msg::Cancelled => "❌ لغو شد.",
        Msg::ErrorOccurred => "متأسفم، اما در پردازش درخواست شما خطایی رخ داد. لطفاً دوباره تلاش کنید.",
        Msg::FlowExpired => "❌ این مرحله دیگر فعال نیست. لطفاً دوباره از منو شروع کنید.",
        Msg::SelectDate => "📅 یک تاریخ برای رویداد خود انتخاب کنید (یا YYYY-MM-DD، 'today' یا 'tomorrow' تایپ کنید):",
        Msg::SelectTime => "📅 تاریخ: {date}\n\n⏰ زمان را انتخاب کنید (یا تایپ کنید، مثال: 14:30):",
        Msg::SelectMinutes => "⏰ دقیقه را برای ساعت {hour} انتخاب کنید:",
        Msg::EnterTitle => "📝 لطفاً عنوان/توضیحات رویداد را تایپ کنید:",
        Msg::EventCreated => "✅ رویداد با موفقیت ایجاد شد!",
        Msg::EventFailed => "❌ خطا در ایجاد رویداد: {error}",
        Msg::UpcomingEvents => "📅 رویدادهای آینده شما:",
        Msg::NoUpcoming => "شما رویداد آینده‌ای ندارید. برنامه شما خالی است! ✨",
        Msg::TodaySchedule => "📋 برنامه امروز ({date}):",
        Msg::NoToday => "رویدادی برای امروز ({date}) ثبت نشده. از روز آزاد خود لذت ببرید! 🌟",
        Msg::DateSchedule => "📋 برنامه {date}:",
        Msg::NoDate => "رویدادی برای {date} ثبت نشده.",
        Msg::SearchQuery => "🔍 لطفاً کلمه جستجو را وارد کنید:",
        Msg::FoundEvents => "🔍 رویدادهای مطابق با '{query}' پیدا شد:",
        Msg::NoFound => "رویدادی مطابق با '{query}' پیدا نشد.",
        Msg::SelectDelete => "🗑️ یک رویداد برای حذف انتخاب کنید:",
        Msg::NoDelete => "شما رویداد آینده‌ای برای حذف ندارید.",
        Msg::ConfirmDelete => "⚠️ آیا مطمئن هستید که می‌خواهید این رویداد را حذف کنید؟",
        Msg::EventDeleted => "✅ رویداد با موفقیت حذف شد!",
        Msg::DeleteFailed => "❌ خطا در حذف رویداد: {error}",
        Msg::SelectEdit => "✏️ یک رویداد برای ویرایش انتخاب کنید:",
        Msg::NoEdit => "رویداد آینده‌ای برای ویرایش وجود ندارد.",
        Msg::EnterNewTitle => "✏️ ویرایش: {title}\n\n📝 لطفاً عنوان جدید را تایپ کنید:",
        Msg::TitleUpdated => "✅ عنوان رویداد به {title} تغییر کرد",
        Msg::UpdateFailed => "❌ خطا در ویرایش رویداد: {error}",
        Msg::PickByNumber => "روی یک دکمه بزنید یا شماره رویداد را تایپ کنید.",
        Msg::InvalidDate => "❌ فرمت تاریخ نامعتبر است. لطفاً از فرمت YYYY-MM-DD استفاده کنید (مثال: 2025-11-25) یا 'today' یا 'tomorrow' تایپ کنید:",
        Msg::InvalidTime => "❌ فرمت زمان نامعتبر است. لطفاً از فرمت HH:MM استفاده کنید (مثال: 14:30 یا 2:30 PM):",
        Msg::InvalidNumber => "❌ لطفاً یک عدد معتبر وارد کنید:",
        Msg::InvalidEventNumber => "❌ شماره رویداد نامعتبر است. لطفاً دوباره تلاش کنید.",
        Msg::EmptyText => "❌ لطفاً متنی تایپ کنید:",
        Msg::UnexpectedInput => "❌ این ورودی با این مرحله سازگار نیست.",
        Msg::ErrorNoDatetime => "❌ خطا: تاریخ/زمان انتخاب نشده. لطفاً دوباره تلاش کنید.",
        Msg::EnterTaskTitle => "✅ وظیفه چیست؟",
        Msg::TaskAdded => "✅ وظیفه #{id} اضافه شد: {title}",
        Msg::NoTasks => "هیچ وظیفه بازی ندارید. 🎉",
        Msg::TasksHeader => "📝 وظایف شما:",
        Msg::TaskCompleted => "✅ انجام شد: {title}",
        Msg::TaskDeleted => "🗑️ وظیفه حذف شد: {title}",
        Msg::EnterNoteTitle => "🗒️ لطفاً عنوان یادداشت را تایپ کنید:",
        Msg::EnterNoteContent => "🗒️ {title}\n\nحالا متن یادداشت را تایپ کنید:",
        Msg::NoteSaved => "✅ یادداشت #{id} ذخیره شد: {title}",
        Msg::NoNotes => "هنوز یادداشتی ندارید.",
        Msg::NotesHeader => "📒 یادداشت‌های شما:",
        Msg::NoteDeleted => "🗑️ یادداشت حذف شد: {title}",
        Msg::MatchingTasks => "📝 وظایف مطابق:",
        Msg::MatchingNotes => "📒 یادداشت‌های مطابق:",
        Msg::Failed => "❌ {error}",
        Msg::UnclearTime => "زمان مشخص‌شده را متوجه نشدم. لطفاً زمان را واضح‌تر بنویسید.",
        Msg::NeedQuery => "لطفاً مشخص کنید دنبال چه چیزی می‌گردید.",
        Msg::NeedDeleteTarget => "لطفاً مشخص کنید کدام رویداد را می‌خواهید حذف کنید.",
        Msg::NeedUpdateTarget => "لطفاً مشخص کنید کدام رویداد را می‌خواهید ویرایش کنید.",
        Msg::NothingToUpdate => "چه چیزی از این رویداد را می‌خواهید تغییر دهید؟",
        Msg::AmbiguousMatches => "{count} رویداد با '{query}' پیدا شد. لطفاً دقیق‌تر بگویید:",
        Msg::DeletedTitle => "✅ حذف شد: {title}",
        Msg::EventUpdated => "✅ رویداد با موفقیت به‌روزرسانی شد!",
        Msg::SelectLanguage => "🌐 Select your language:\n\nانتخاب زبان:",
        Msg::LanguageChanged => "✅ زبان به فارسی تغییر کرد",
        Msg::BtnCancel => "❌ لغو",
        Msg::BtnBackToHours => "🔙 بازگشت به ساعت‌ها",
        Msg::BtnConfirmDelete => "✅ بله، حذف شود",
        Msg::BtnBack => "🔙 بازگشت",
        Msg::BtnComplete => "✅ انجام شد",
        Msg::BtnDelete => "🗑️ حذف",
        Msg::BtnView => "👁️ نمایش",
    }
}
