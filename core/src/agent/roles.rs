use crate::agent::prompt::Language;
use serde::{Deserialize, Serialize};

/// A fixed persona assigned to one sub-agent of a collaboration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRole {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub expertise: Vec<String>,
    /// Tool names the role may mention. Listed in its prompt only.
    #[serde(default)]
    pub tools: Vec<String>,
}

impl AgentRole {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            expertise: vec![],
            tools: vec![],
        }
    }

    pub fn with_expertise<I, S>(mut self, expertise: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expertise = expertise.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools = tools.into_iter().map(Into::into).collect();
        self
    }
}

/// Name of the synthesizing role among [`default_roles`].
pub fn coordinator_name(language: Language) -> &'static str {
    match language {
        Language::Chinese => "协调员",
        Language::English => "Coordinator",
    }
}

/// Researcher, analyst and coordinator, in that order.
pub fn default_roles(language: Language) -> Vec<AgentRole> {
    match language {
        Language::Chinese => vec![
            AgentRole::new("研究员", "负责信息收集和事实核查")
                .with_expertise(["搜索", "验证", "总结"])
                .with_tools(["search", "get_time"]),
            AgentRole::new("分析师", "负责数据分析和洞察")
                .with_expertise(["计算", "统计", "可视化"])
                .with_tools(["calculator"]),
            AgentRole::new(coordinator_name(language), "负责任务分配和结果整合")
                .with_expertise(["规划", "协调", "总结"])
                .with_tools(["get_time"]),
        ],
        Language::English => vec![
            AgentRole::new("Researcher", "responsible for gathering information and fact checking")
                .with_expertise(["search", "verification", "summarization"])
                .with_tools(["search", "get_time"]),
            AgentRole::new("Analyst", "responsible for data analysis and insight")
                .with_expertise(["calculation", "statistics", "visualization"])
                .with_tools(["calculator"]),
            AgentRole::new(
                coordinator_name(language),
                "responsible for task allocation and integrating results",
            )
            .with_expertise(["planning", "coordination", "summarization"])
            .with_tools(["get_time"]),
        ],
    }
}
