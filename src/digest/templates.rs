use serde::Deserialize;

/// Output language of the digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    #[default]
    Cn,
}

/// Fixed text for one language. `{date}`, `{count}` and `{feed}` are
/// substituted at render time.
#[derive(Debug)]
pub struct Labels {
    pub heading: &'static str,
    pub intro: &'static str,
    pub section: &'static str,
    pub from: &'static str,
    pub summary: &'static str,
    pub link: &'static str,
    pub read_more: &'static str,
    pub footer: &'static str,
    pub empty: &'static str,
}

const EN: Labels = Labels {
    heading: "🗞️ HN Popular Blogs Daily Digest — {date}",
    intro: "{count} new articles from the most popular HN blogs of 2025.",
    section: "{feed} ({count} articles)",
    from: "from",
    summary: "**📝 Summary**: ",
    link: "**🔗 Link**: ",
    read_more: "Read more",
    footer: "*Source: The Most Popular Blogs of Hacker News 2025*",
    empty: "No new articles in the past 24 hours.",
};

const CN: Labels = Labels {
    heading: "🗞️ HN 热门博客日报 {date}",
    intro: "来自 HN 2025 最受欢迎的技术博客，本期精选 {count} 篇新文章。",
    section: "{feed}（{count} 篇）",
    from: "from",
    summary: "**📝 摘要**：",
    link: "**🔗 原文**：",
    read_more: "查看原文",
    footer: "*数据来源：HN 2025 最受欢迎博客 RSS 聚合*",
    empty: "过去24小时没有新文章。",
};

impl Language {
    pub fn labels(self) -> &'static Labels {
        match self {
            Language::En => &EN,
            Language::Cn => &CN,
        }
    }
}
