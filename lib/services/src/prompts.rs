// System prompts for the chat-completions structurer

pub const PROFILE_SYSTEM_PROMPT: &str = "\
You extract structured data from resumes. Reply with a single JSON object and \
nothing else. Use exactly these fields:
- name (string)
- location (string)
- current_job_title (string)
- preferred_job_title (string)
- skills (array of strings)
- experience (array of objects with company, title, duration, description)
- education (array of objects with institution, degree, field, year)

Use null for anything the resume does not state. Example:
{
  \"name\": \"Priya Sharma\",
  \"location\": \"Pune, Maharashtra\",
  \"current_job_title\": \"Backend Developer\",
  \"preferred_job_title\": \"Platform Engineer\",
  \"skills\": [\"Rust\", \"PostgreSQL\", \"Kubernetes\"],
  \"experience\": [
    {
      \"company\": \"Acme Payments\",
      \"title\": \"Backend Developer\",
      \"duration\": \"2021-2024\",
      \"description\": \"Built settlement services and internal APIs\"
    }
  ],
  \"education\": [
    {
      \"institution\": \"College of Engineering Pune\",
      \"degree\": \"B.Tech\",
      \"field\": \"Computer Engineering\",
      \"year\": \"2021\"
    }
  ]
}";

pub const QUERY_SYSTEM_PROMPT: &str = "\
You extract structured data from job descriptions. Reply with a single JSON \
object and nothing else. Use exactly these fields:
- job_title (string)
- required_skills (array of strings)
- required_experience (string)
- required_education (string)
- location (string)

Example:
{
  \"job_title\": \"Machine Learning Engineer\",
  \"required_skills\": [\"Python\", \"PyTorch\", \"SQL\"],
  \"required_experience\": \"2+ years building production ML systems\",
  \"required_education\": \"Bachelor's in Computer Science or a related field\",
  \"location\": \"Bengaluru, India\"
}";
