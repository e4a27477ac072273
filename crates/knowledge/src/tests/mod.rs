mod rag_flow;
