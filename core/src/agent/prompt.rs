use crate::agent::collaboration::Stage;
use crate::agent::parser::Markers;
use crate::agent::roles::AgentRole;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Working language of a deployment: picks the section markers and the
/// wording of every prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "zh")]
    Chinese,
    #[serde(rename = "en")]
    English,
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Chinese => write!(f, "zh"),
            Self::English => write!(f, "en"),
        }
    }
}

impl std::str::FromStr for Language {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "zh" | "chinese" => Ok(Self::Chinese),
            "en" | "english" => Ok(Self::English),
            _ => Err(anyhow::anyhow!("Unknown language: {}. Available: zh, en", s)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PromptBuilder {
    pub language: Language,
    pub markers: Markers,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(Language::default())
    }
}

impl PromptBuilder {
    pub fn new(language: Language) -> Self {
        Self {
            language,
            markers: Markers::for_language(language),
        }
    }

    pub fn with_markers(mut self, markers: Markers) -> Self {
        self.markers = markers;
        self
    }

    /// Prompt for one ReAct turn: tool list, question, and the transcript of
    /// earlier turns.
    pub fn react_prompt(&self, tools: &str, question: &str, transcript: &str) -> String {
        let m = &self.markers;
        let mut prompt = match self.language {
            Language::Chinese => format!(
                "你是一个智能助手，可以调用工具来完成任务。\n\n\
                 可用工具：\n{tools}\n\n\
                 思考过程：\n\
                 1. 分析问题，确定需要使用的工具\n\
                 2. 调用工具获取信息\n\
                 3. 基于结果继续思考或给出最终答案\n\n\
                 格式：\n\
                 {t}<你的推理过程>\n\
                 {a}<工具名称>\n\
                 {ai}<JSON 格式的工具参数>\n\
                 {o}<工具返回结果>\n\
                 ... (可以重复思考-行动-观察)\n\
                 {t}<最终推理>\n\
                 {fa}<给用户的答案>\n\n\
                 问题：{question}\n",
                t = m.thought,
                a = m.action,
                ai = m.action_input,
                o = m.observation,
                fa = m.final_answer,
            ),
            Language::English => format!(
                "You are a helpful assistant that can call tools to complete tasks.\n\n\
                 Available tools:\n{tools}\n\n\
                 How to work:\n\
                 1. Analyze the question and decide which tool you need\n\
                 2. Call the tool to gather information\n\
                 3. Keep reasoning on the result or give the final answer\n\n\
                 Format:\n\
                 {t} <your reasoning>\n\
                 {a} <tool name>\n\
                 {ai} <tool arguments as JSON>\n\
                 {o} <tool result>\n\
                 ... (Thought/Action/Observation may repeat)\n\
                 {t} <final reasoning>\n\
                 {fa} <answer for the user>\n\n\
                 Question: {question}\n",
                t = m.thought,
                a = m.action,
                ai = m.action_input,
                o = m.observation,
                fa = m.final_answer,
            ),
        };

        if !transcript.is_empty() {
            prompt.push_str(transcript.trim_start_matches('\n'));
            if !prompt.ends_with('\n') {
                prompt.push('\n');
            }
        }
        prompt.push_str(&m.thought);
        prompt
    }

    /// Transcript lines appended after a tool turn so the next prompt sees it.
    pub fn transcript_fragment(&self, thought: &str, action: &str, observation: &str) -> String {
        let m = &self.markers;
        let mut fragment = String::new();
        let _ = writeln!(fragment);
        let _ = writeln!(fragment, "{}{}", m.thought, thought);
        let _ = writeln!(fragment, "{}{}", m.action, action);
        let _ = writeln!(fragment, "{}{}", m.observation, observation);
        fragment
    }

    pub fn role_prompt(
        &self,
        role: &AgentRole,
        task: &str,
        stage: Stage,
        other_opinions: &str,
    ) -> String {
        let expertise = role.expertise.join(", ");
        let tools = role.tools.join(", ");
        let stage = stage.label(self.language);

        match self.language {
            Language::Chinese => format!(
                "你是 {name}，{description}\n\n\
                 你的专长：{expertise}\n\
                 可用工具：{tools}\n\n\
                 任务：{task}\n\
                 当前状态：{stage}\n\
                 其他 Agent 的意见：{other_opinions}\n\n\
                 请基于你的专长提供建议或执行任务：",
                name = role.name,
                description = role.description,
            ),
            Language::English => format!(
                "You are {name}, {description}\n\n\
                 Your expertise: {expertise}\n\
                 Available tools: {tools}\n\n\
                 Task: {task}\n\
                 Current stage: {stage}\n\
                 Other agents' opinions: {other_opinions}\n\n\
                 Offer your advice or carry out the task based on your expertise:",
                name = role.name,
                description = role.description,
            ),
        }
    }

    /// Placeholder for "no opinions yet".
    pub fn no_opinions(&self) -> &'static str {
        match self.language {
            Language::Chinese => "暂无",
            Language::English => "none",
        }
    }
}
