use super::Config;

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_llm();
        self.apply_env_overrides_index();
    }

    fn apply_env_overrides_llm(&mut self) {
        if let Ok(v) = std::env::var("STUDYBUDDY_LLM_BACKEND") {
            match v.parse() {
                Ok(kind) => self.llm.backend = Some(kind),
                Err(e) => tracing::warn!("ignoring invalid STUDYBUDDY_LLM_BACKEND value: {e}"),
            }
        }
        if let Ok(v) = std::env::var("STUDYBUDDY_HOSTED_BASE_URL") {
            self.llm.hosted.base_url = v;
        }
        if let Ok(v) = std::env::var("STUDYBUDDY_HOSTED_MODEL") {
            self.llm.hosted.model = v;
        }
        if let Ok(v) = std::env::var("STUDYBUDDY_LOCAL_BASE_URL") {
            self.llm.local.base_url = v;
        }
        if let Ok(v) = std::env::var("STUDYBUDDY_LOCAL_MODEL") {
            self.llm.local.model = v;
        }
        if let Ok(v) = std::env::var("STUDYBUDDY_LLM_MAX_TOKENS")
            && let Ok(n) = v.parse::<u32>()
        {
            self.llm.max_tokens = Some(n);
        }
        if let Ok(v) = std::env::var("STUDYBUDDY_EMBEDDING_PROVIDER") {
            if let Ok(kind) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.embedding.provider = kind;
            } else {
                tracing::warn!("ignoring invalid STUDYBUDDY_EMBEDDING_PROVIDER value: {v}");
            }
        }
        if let Ok(v) = std::env::var("STUDYBUDDY_EMBEDDING_MODEL") {
            self.embedding.model = Some(v);
        }
        if let Ok(v) = std::env::var("STUDYBUDDY_EMBEDDING_BASE_URL") {
            self.embedding.base_url = v;
        }
    }

    fn apply_env_overrides_index(&mut self) {
        if let Ok(v) = std::env::var("STUDYBUDDY_INDEX_URL") {
            self.index.url = v;
        }
        if let Ok(v) = std::env::var("STUDYBUDDY_INDEX_NAME") {
            self.index.name = v;
        }
        if let Ok(v) = std::env::var("STUDYBUDDY_INDEX_TOP_K")
            && let Ok(k) = v.parse::<usize>()
        {
            self.index.top_k = k;
        }
        if let Ok(v) = std::env::var("STUDYBUDDY_CORPUS_PATH") {
            self.index.corpus_path = v;
        }
        if let Ok(v) = std::env::var("STUDYBUDDY_INDEX_RETRY_MAX_ATTEMPTS")
            && let Ok(n) = v.parse::<u32>()
        {
            self.index.retry.max_attempts = n;
        }
        if let Ok(v) = std::env::var("STUDYBUDDY_TIMEOUT_ANSWER")
            && let Ok(secs) = v.parse::<u64>()
        {
            self.timeouts.answer_seconds = secs;
        }
    }
}
